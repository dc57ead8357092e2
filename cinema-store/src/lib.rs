pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod memory_repo;
pub mod session_client;

pub use booking_repo::PostgresBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use memory_repo::MemoryBookingRepository;
pub use session_client::HttpSessionProvider;
