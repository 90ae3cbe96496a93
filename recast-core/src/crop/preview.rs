//! Printable crop results.

use super::Rectangle;
use crate::utils::escape_command;

use std::path::Path;

/// Name printed in the suggested re-run command.
const PROGRAM_NAME: &str = "recast";

/// Lines to print for a detected crop. Without `preview` that is just the
/// `W:H:X:Y` geometry; with it, two mpv commands to inspect the result and
/// the command that applies it.
pub fn present_crop(crop: &Rectangle, input: &Path, preview: bool) -> Vec<String> {
    let crop_string = crop.to_string();
    if !preview {
        return vec![crop_string];
    }

    let path = input.to_string_lossy().into_owned();
    let drawbox = format!("{}:{}:{}:{}", crop.x, crop.y, crop.width, crop.height);

    vec![
        String::new(),
        escape_command(&[
            "mpv".to_string(),
            "--no-audio".to_string(),
            format!("--vf=lavfi=[drawbox={drawbox}:invert:1]"),
            path.clone(),
        ]),
        escape_command(&[
            "mpv".to_string(),
            "--no-audio".to_string(),
            format!("--vf=crop={crop_string}"),
            path.clone(),
        ]),
        String::new(),
        escape_command(&[
            PROGRAM_NAME.to_string(),
            "--crop".to_string(),
            crop_string,
            path,
        ]),
        String::new(),
    ]
}
