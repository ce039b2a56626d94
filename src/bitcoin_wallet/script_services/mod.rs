pub mod input_service;
pub mod psbt_factory;
