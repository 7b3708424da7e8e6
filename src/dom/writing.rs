// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Turning documents back into text.

pub mod canonical;
pub mod mutated;
pub mod text_tree;

pub use canonical::CanonicalCodeGenerator;
pub use mutated::{MutatedDocumentTextGenerator, Mutations, NoMutations, NodeMutations};
pub use text_tree::{ChildTag, TextPreservingTree, TextTreeChild, TextTreeNode};
