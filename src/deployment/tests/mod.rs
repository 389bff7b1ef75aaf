//! Unit tests for the deployment context.

mod support;
