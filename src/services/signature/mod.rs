pub mod signature_service;

pub use signature_service::{SignedProfile, UserProfile, sign_message, sign_profile, verify_message, verify_profile};
