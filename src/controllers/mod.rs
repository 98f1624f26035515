pub mod home_controller;
pub mod webhook_controller;
