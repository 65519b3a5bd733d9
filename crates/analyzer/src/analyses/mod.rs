//! The built-in analysis passes, each a zero-sized [`Analysis`](crate::manager::Analysis)
//! marker type whose [`AnalysisManager`](crate::manager::AnalysisManager) output is documented
//! on the type itself.

mod cfgs;
mod dominators;
mod ebb;
mod frequency;
mod tree_height;

pub use cfgs::Cfgs;
pub use dominators::{dominators, DomBuilder, DomSets};
pub use ebb::{ExtendBasicBlockBuilder, ExtendedBasicBlock};
pub use frequency::{census, FrequencyEntry, HighFrequencySubExpr, Options as FrequencyOptions};
pub use tree_height::{balance_module, Options as TreeHeightOptions, Tree, TreeHeightBalancing, TreeNode};
