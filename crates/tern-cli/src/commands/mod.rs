pub(crate) mod helpers;
pub(crate) mod problems;
pub(crate) mod verify;
