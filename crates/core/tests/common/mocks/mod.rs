//! Mock implementations of controller seams.
