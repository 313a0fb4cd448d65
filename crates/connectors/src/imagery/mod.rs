pub mod earth_engine;
