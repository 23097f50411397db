use crate::touch::error::SurfaceError;
use crate::touch::model::Color;
use crate::touch::render::{DirtyRect, Surface};

/// Copies `src` over `dst` inside `rect`, replacing whatever `dst` held.
pub fn paint_rect(dst: &mut Surface, src: &Surface, rect: DirtyRect) -> Result<(), SurfaceError> {
    ensure_same_size(dst, src)?;
    let Some(rect) = rect.clamp(dst.width(), dst.height()) else {
        return Ok(());
    };
    let stride = dst.width() as usize * 4;
    let x0 = rect.x as usize * 4;
    let x1 = (rect.x + rect.width) as usize * 4;
    for y in rect.y..(rect.y + rect.height) {
        let row = y as usize * stride;
        dst.pixels_mut()[row + x0..row + x1].copy_from_slice(&src.pixels()[row + x0..row + x1]);
    }
    Ok(())
}

/// Blends `src` over `dst` inside `rect`, using `src`'s own alpha as the mask.
///
/// Pixels where `src` is fully transparent are left untouched.
pub fn mask_rect(dst: &mut Surface, src: &Surface, rect: DirtyRect) -> Result<(), SurfaceError> {
    ensure_same_size(dst, src)?;
    let Some(rect) = rect.clamp(dst.width(), dst.height()) else {
        return Ok(());
    };
    let width = dst.width();
    for y in rect.y..(rect.y + rect.height) {
        for x in rect.x..(rect.x + rect.width) {
            let idx = ((y as u32 * width + x as u32) * 4) as usize;
            let top = color_at(src.pixels(), idx);
            if top.a == 0 {
                continue;
            }
            let blended = blend_pixel(color_at(dst.pixels(), idx), top);
            store(dst.pixels_mut(), idx, blended);
        }
    }
    Ok(())
}

pub(crate) fn color_at(pixels: &[u8], idx: usize) -> Color {
    Color {
        r: pixels[idx],
        g: pixels[idx + 1],
        b: pixels[idx + 2],
        a: pixels[idx + 3],
    }
}

pub(crate) fn store(pixels: &mut [u8], idx: usize, color: Color) {
    pixels[idx] = color.r;
    pixels[idx + 1] = color.g;
    pixels[idx + 2] = color.b;
    pixels[idx + 3] = color.a;
}

fn ensure_same_size(dst: &Surface, src: &Surface) -> Result<(), SurfaceError> {
    if dst.size() != src.size() {
        return Err(SurfaceError::SizeMismatch {
            expected: dst.size(),
            actual: src.size(),
        });
    }
    Ok(())
}

/// Source-over for straight (non-premultiplied) RGBA.
pub fn blend_pixel(bottom: Color, top: Color) -> Color {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Color::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Color {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}
