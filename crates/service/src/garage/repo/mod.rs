pub mod memory;
pub mod seaorm;

pub use memory::MemoryGarageRepository;
pub use seaorm::SeaOrmGarageRepository;
