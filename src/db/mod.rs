pub mod postgres;

pub use postgres::PriceDatabase;
