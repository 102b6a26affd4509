/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health and database check endpoints
/// - `auth`: Authentication and account endpoints
/// - `organization`: Organization and member administration
/// - `users`: Organization user directory
/// - `activities`: Activities and the approval workflow
/// - `tasks`: Task CRUD
/// - `status_configuration`: Status registry
/// - `projects`: Project listing

pub mod activities;
pub mod auth;
pub mod health;
pub mod organization;
pub mod projects;
pub mod status_configuration;
pub mod tasks;
pub mod users;
