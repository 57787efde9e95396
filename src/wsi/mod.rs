//! The wsi module provides the frame loop that sits between recording and presentation.
//! Window and swap chain management are left to the application, which plugs in through the [`Present`](crate::Present) trait.

pub mod frame;
