//! Live navigation: tracking, routing and the session controller

pub mod controller;
pub mod distance;
pub mod position;
pub mod route;
pub mod tracker;
pub mod view;
