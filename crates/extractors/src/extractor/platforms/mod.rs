pub mod bilibili;
pub mod haokan;
pub mod universal;
pub mod youtube;
