//! Client for the PetReel API.
//!
//! Submits an upload and polls the task's status until the video is ready,
//! with separate delays for waiting and running tasks and a retry budget
//! for errors.

pub mod client;
pub mod error;
pub mod policy;
pub mod poller;

pub use client::{ClientConfig, PetReelClient, Photo, StatusReply};
pub use error::{ClientError, ClientResult};
pub use policy::PollPolicy;
pub use poller::{PollOutcome, Poller};
