//! Helpers for standing up a throwaway database in tests and local experiments.

pub mod prepare_env;
