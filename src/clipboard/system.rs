//! 系统剪贴板实现（arboard + image）

use std::borrow::Cow;
use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, RgbaImage};

use super::{ClipboardKind, ClipboardProvider};
use crate::error::AppError;
use crate::request::decode_base64_lenient;

/// 基于 `arboard` 的系统剪贴板。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, AppError> {
        arboard::Clipboard::new().map_err(|e| AppError::Clipboard(e.to_string()))
    }
}

impl ClipboardProvider for SystemClipboard {
    type Image = RgbaImage;

    fn detect_type(&self) -> ClipboardKind {
        let Ok(mut clipboard) = Self::open() else {
            return ClipboardKind::None;
        };
        if clipboard.get_text().is_ok_and(|t| !t.is_empty()) {
            return ClipboardKind::Text;
        }
        if clipboard.get_image().is_ok() {
            return ClipboardKind::Image;
        }
        ClipboardKind::None
    }

    fn read_text(&self) -> Result<String, AppError> {
        let mut clipboard = Self::open()?;
        match clipboard.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(AppError::Clipboard(e.to_string())),
        }
    }

    fn read_image(&self) -> Result<Option<RgbaImage>, AppError> {
        let mut clipboard = Self::open()?;
        let data = match clipboard.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e) => return Err(AppError::Clipboard(e.to_string())),
        };

        let image = RgbaImage::from_raw(
            data.width as u32,
            data.height as u32,
            data.bytes.into_owned(),
        )
        .ok_or_else(|| AppError::Clipboard("创建图像缓冲区失败".to_string()))?;

        log::debug!("🖼️ 读取剪贴板图片 - 尺寸: {}x{}", image.width(), image.height());
        Ok(Some(image))
    }

    fn write_text(&self, text: &str) -> Result<(), AppError> {
        let mut clipboard = Self::open()?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| AppError::Clipboard(e.to_string()))
    }

    fn write_image(&self, image: RgbaImage) -> Result<(), AppError> {
        let mut clipboard = Self::open()?;
        let (width, height) = image.dimensions();
        let data = arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(image.into_raw()),
        };
        clipboard
            .set_image(data)
            .map_err(|e| AppError::Clipboard(e.to_string()))
    }

    fn encode_png_base64(&self, image: &RgbaImage) -> Result<String, AppError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AppError::Clipboard(format!("PNG 编码失败: {}", e)))?;
        Ok(general_purpose::STANDARD.encode(png))
    }

    fn decode_base64_image(&self, b64: &str) -> Result<RgbaImage, AppError> {
        let bytes = decode_base64_lenient(b64)
            .ok_or_else(|| AppError::Clipboard("Base64 图片数据无效".to_string()))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| AppError::Clipboard(format!("图片解码失败：{}", e)))?;
        Ok(image.to_rgba8())
    }
}
