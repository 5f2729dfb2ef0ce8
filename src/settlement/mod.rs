//! Settlement module containing period resolution, invoice settlement and
//! aggregate posting

pub mod period;
pub mod planner;
pub mod posting;

pub use period::*;
pub use planner::*;
pub use posting::*;
