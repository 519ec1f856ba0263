// Line-rescue robot runtime.
//
// A differential-drive robot follows a reflective line, negotiates marked
// and unmarked intersections, adapts speed to reported inclines, and picks
// up a recovery object on cue from a forward-sensing co-processor.

pub mod color;
pub mod config;
pub mod hw;
pub mod incline;
pub mod link;
pub mod motor;
pub mod navigator;
pub mod pid;
pub mod rescue;
pub mod runtime;
