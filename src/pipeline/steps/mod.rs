pub mod stage_load;
pub mod transform;

pub use stage_load::StagingLoader;
pub use transform::WindowTransformer;
