pub mod handler;
pub mod params;

pub use handler::SkillGraphServer;
