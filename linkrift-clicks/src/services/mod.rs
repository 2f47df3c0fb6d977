pub mod click_service;
