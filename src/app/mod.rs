//! Core runtime: reactive state, event bus, background tasks, navigation, and
//! the controller that wires them together.

pub mod action;
pub mod bus;
pub mod controller;
pub mod error;
pub mod event;
pub mod handler;
pub mod navigation;
pub mod state;
pub mod tasks;
