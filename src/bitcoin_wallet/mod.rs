pub mod address_formats;
pub mod constants;
pub mod error;
pub mod fee_policy;
pub mod input_data;
pub mod key_material;
pub mod script_services;
pub mod spending_path;
pub mod transfer;
