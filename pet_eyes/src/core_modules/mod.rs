pub mod frame;
pub mod pixel;
pub mod registry;
pub mod utils;
pub mod vision_model;
