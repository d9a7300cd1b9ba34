pub mod playback;
pub mod scheduler;
pub mod vlc_process;
