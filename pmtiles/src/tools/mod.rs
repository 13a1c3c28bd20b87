pub mod convert;
pub mod serve;
pub mod show;
pub mod subpyramid;
