pub mod access;
pub mod background_jobs;
pub mod error;
pub mod payment_provider;
pub mod realtime;
pub mod storage;
pub mod task_filter;
pub mod webhook;
