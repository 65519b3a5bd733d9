//! The dependency every other analysis in this module builds on: one
//! [`Cfg`] per non-imported function, in function order.

use alloc::vec::Vec;

use crate::cfg::Cfg;
use crate::error::Error;
use crate::manager::{Analysis, AnalysisManager};

pub struct Cfgs;

impl Analysis for Cfgs {
    type Output = Vec<Cfg>;

    fn run(manager: &AnalysisManager) -> Result<Self::Output, Error> {
        manager.module().defined_functions().map(Cfg::build).collect::<Result<Vec<_>, _>>().map_err(Error::from)
    }
}
