/// YUV420P ↔ RGB 转换 (YUV420P to RGB and back)
///
/// 系数为 BT.601 全范围整数近似, 解码端与编码端互逆 (误差在几个灰阶内)。
use image::{Rgb, RgbImage};

/// 一帧 YUV420P 的三个平面 (借用解码器缓冲区)
pub struct Yuv420Planes<'a> {
    pub y: &'a mut [u8],
    pub u: &'a mut [u8],
    pub v: &'a mut [u8],
    pub y_stride: usize,
    pub uv_stride: usize,
    pub width: u32,
    pub height: u32,
}

impl<'a> Yuv420Planes<'a> {
    /// 各平面所需最小长度 (Y, U/V)
    pub fn required_len(y_stride: usize, uv_stride: usize, height: u32) -> (usize, usize) {
        let h = height as usize;
        (y_stride * h, uv_stride * h.div_ceil(2))
    }

    /// 平面尺寸与步长是否足够容纳 width x height
    pub fn is_consistent(&self) -> bool {
        let (y_len, uv_len) = Self::required_len(self.y_stride, self.uv_stride, self.height);
        let w = self.width as usize;
        self.y_stride >= w
            && self.uv_stride >= w.div_ceil(2)
            && self.y.len() >= y_len
            && self.u.len() >= uv_len
            && self.v.len() >= uv_len
    }

    /// 整帧转换为 RGB
    pub fn to_rgb(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width, self.height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let (x, y) = (x as usize, y as usize);
            let y_val = self.y[y * self.y_stride + x];
            let uv_idx = (y >> 1) * self.uv_stride + (x >> 1);
            *px = Rgb(yuv_to_rgb(y_val, self.u[uv_idx], self.v[uv_idx]));
        }
        img
    }

    /// 只把 `before` → `after` 之间变化的像素写回平面, 返回改动像素数
    ///
    /// 色度按 2x2 块共享, 块内最后一个改动像素决定该块的 U/V。
    pub fn write_changed(&mut self, before: &RgbImage, after: &RgbImage) -> usize {
        let mut changed = 0;
        for (x, y, px) in after.enumerate_pixels() {
            if before.get_pixel(x, y) == px {
                continue;
            }
            let (x, y) = (x as usize, y as usize);
            let (y_val, u_val, v_val) = rgb_to_yuv(px.0);
            self.y[y * self.y_stride + x] = y_val;
            let uv_idx = (y >> 1) * self.uv_stride + (x >> 1);
            self.u[uv_idx] = u_val;
            self.v[uv_idx] = v_val;
            changed += 1;
        }
        changed
    }
}

#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    [
        (y + ((v * 179) >> 7)).clamp(0, 255) as u8,
        (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8,
        (y + ((u * 227) >> 7)).clamp(0, 255) as u8,
    ]
}

#[inline]
pub fn rgb_to_yuv([r, g, b]: [u8; 3]) -> (u8, u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = (77 * r + 150 * g + 29 * b + 128) >> 8;
    let u = ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128;
    let v = ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128;
    (
        y.clamp(0, 255) as u8,
        u.clamp(0, 255) as u8,
        v.clamp(0, 255) as u8,
    )
}
