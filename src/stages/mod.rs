pub mod pipeline;
pub mod stage0_segment;
pub mod stage1_filter;
pub mod stage2_company;
pub mod stage3_students;

pub use pipeline::*;
pub use stage0_segment::*;
pub use stage1_filter::*;
pub use stage2_company::*;
pub use stage3_students::*;
