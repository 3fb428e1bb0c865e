#![forbid(unsafe_code)]

pub mod recording;



#[cfg(test)]
mod draw_state;
#[cfg(test)]
mod upload;
