use crate::config::OverlayConfig;
use crate::error::{GesturepadError, Result};
use crate::gesture::landmarks::HAND_CONNECTIONS;
use crate::gesture::{Lane, LaneBounds};
use crate::telemetry::LiveFrame;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::{debug, warn};

const BACKGROUND: Rgb<u8> = Rgb([16, 22, 27]);
const LANE_IDLE: Rgb<u8> = Rgb([26, 36, 44]);
const LANE_ACTIVE: Rgb<u8> = Rgb([40, 96, 120]);
const DIVIDER: Rgb<u8> = Rgb([168, 182, 193]);
const BONE: Rgb<u8> = Rgb([49, 190, 255]);
const JOINT: Rgb<u8> = Rgb([255, 196, 27]);
const CENTER_MARKER: Rgb<u8> = Rgb([141, 220, 67]);
const FINGER_ON: Rgb<u8> = Rgb([141, 220, 67]);
const FINGER_OFF: Rgb<u8> = Rgb([70, 80, 90]);
const TEXT: Rgb<u8> = Rgb([242, 245, 247]);

const HELP_LINES: [&str; 3] = ["q  quit", "p  next profile", "h  toggle help"];

/// Draws the debug view served at `/v1/overlay.jpg`
pub struct OverlayRenderer {
    width: u32,
    height: u32,
    font: Option<Font<'static>>,
    font_size: f32,
    jpeg_quality: u8,
}

impl OverlayRenderer {
    /// Text is left out when the configured font cannot be loaded
    pub fn new(config: &OverlayConfig) -> Self {
        let font = match std::fs::read(&config.font_path) {
            Ok(data) => {
                let font = Font::try_from_vec(data);
                if font.is_none() {
                    warn!("Failed to parse font file '{}'", config.font_path);
                }
                font
            }
            Err(e) => {
                warn!(
                    "Failed to read font file '{}', overlay text disabled: {}",
                    config.font_path, e
                );
                None
            }
        };

        Self {
            width: config.width,
            height: config.height,
            font,
            font_size: config.font_size,
            jpeg_quality: config.jpeg_quality,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn render(&self, frame: &LiveFrame) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);

        let active_lane = frame
            .snapshot
            .has_hand
            .then(|| frame.bounds.lane_for(frame.snapshot.center_x));
        self.draw_lanes(&mut img, frame.bounds, active_lane);

        if frame.snapshot.has_hand {
            let x = (frame.snapshot.center_x * self.width as f64) as f32;
            draw_line_segment_mut(&mut img, (x, 0.0), (x, self.height as f32), CENTER_MARKER);
            draw_filled_circle_mut(
                &mut img,
                (x as i32, self.height as i32 - 40),
                6,
                CENTER_MARKER,
            );
        }

        if let Some(hand) = &frame.hand {
            for (a, b) in HAND_CONNECTIONS {
                draw_line_segment_mut(
                    &mut img,
                    self.project(hand.point(a)),
                    self.project(hand.point(b)),
                    BONE,
                );
            }
            for point in hand.points() {
                let (x, y) = self.project(*point);
                draw_filled_circle_mut(&mut img, (x as i32, y as i32), 3, JOINT);
            }
        }

        self.draw_fingers(&mut img, frame);

        if let Some(font) = &self.font {
            self.draw_text(&mut img, font, frame);
        }

        img
    }

    pub fn render_jpeg(&self, frame: &LiveFrame) -> Result<Vec<u8>> {
        let img = self.render(frame);
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
        encoder.encode_image(&img).map_err(|e| {
            GesturepadError::component("overlay", format!("Failed to encode JPEG: {}", e))
        })?;
        debug!("Rendered overlay ({} bytes)", buf.len());
        Ok(buf)
    }

    fn project(&self, point: crate::gesture::Landmark) -> (f32, f32) {
        (
            (point.x * self.width as f64) as f32,
            (point.y * self.height as f64) as f32,
        )
    }

    fn draw_lanes(&self, img: &mut RgbImage, bounds: LaneBounds, active: Option<Lane>) {
        let left_x = (bounds.left() * self.width as f64) as u32;
        let right_x = (bounds.right() * self.width as f64) as u32;

        let zones = [
            (Lane::Left, 0, left_x),
            (Lane::Center, left_x, right_x),
            (Lane::Right, right_x, self.width),
        ];
        for (lane, start, end) in zones {
            if end <= start {
                continue;
            }
            let color = if active == Some(lane) {
                LANE_ACTIVE
            } else {
                LANE_IDLE
            };
            draw_filled_rect_mut(
                img,
                Rect::at(start as i32, 0).of_size(end - start, self.height),
                color,
            );
        }

        for x in [left_x, right_x] {
            draw_line_segment_mut(
                img,
                (x as f32, 0.0),
                (x as f32, self.height as f32),
                DIVIDER,
            );
        }
    }

    fn draw_fingers(&self, img: &mut RgbImage, frame: &LiveFrame) {
        let size = 14;
        let y = self.height.saturating_sub(size + 10) as i32;
        for (i, extended) in frame.snapshot.fingers.as_array().into_iter().enumerate() {
            let x = 10 + i as i32 * (size as i32 + 6);
            let color = if extended { FINGER_ON } else { FINGER_OFF };
            draw_filled_rect_mut(img, Rect::at(x, y).of_size(size, size), color);
        }
    }

    fn draw_text(&self, img: &mut RgbImage, font: &Font<'static>, frame: &LiveFrame) {
        let scale = Scale::uniform(self.font_size);
        let header = format!(
            "{}   FPS {}   PROFILE {}",
            frame.snapshot.action, frame.fps, frame.profile
        );
        draw_text_mut(img, TEXT, 10, 10, scale, font, &header);

        if frame.show_help {
            let line_height = (self.font_size * 1.3) as i32;
            let x = self.width as i32 - (self.font_size * 9.0) as i32;
            for (i, line) in HELP_LINES.iter().enumerate() {
                draw_text_mut(
                    img,
                    DIVIDER,
                    x,
                    10 + line_height * (i as i32 + 1),
                    scale,
                    font,
                    line,
                );
            }
        }
    }
}
