//! Shared bench utilities.
