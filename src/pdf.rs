use printpdf::path::{PaintMode as PdfPaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef, Line,
    Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Polygon, Px, Rgb,
};
use std::io::{BufWriter, Cursor};

use crate::assets::{FontAssets, FontFace, FontSource, LoadedFont};
use crate::canvas::{Color, Document, DrawOp, PaintMode, PAGE_HEIGHT, PAGE_WIDTH};
use crate::error::RenderError;
use crate::font_metrics::PT_TO_MM;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Images are placed at 72 DPI so one pixel is one point before scaling.
const IMAGE_DPI: f32 = 72.0;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Serialize laid-out pages into PDF bytes.
pub fn write_document(doc: &Document, fonts: &FontAssets, title: &str) -> Result<Vec<u8>, RenderError> {
    let (pdf, page1, layer1) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let fonts = Fonts {
        regular: add_font(&pdf, &fonts.regular, FontFace::Regular)?,
        bold: add_font(&pdf, &fonts.bold, FontFace::Bold)?,
    };

    let images = doc
        .images
        .iter()
        .map(|png| decode_png(png))
        .collect::<Result<Vec<_>, _>>()?;

    for (i, page) in doc.pages.iter().enumerate() {
        let layer = if i == 0 {
            pdf.get_page(page1).get_layer(layer1)
        } else {
            let (new_page, new_layer) = pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            pdf.get_page(new_page).get_layer(new_layer)
        };

        for op in &page.ops {
            draw_op(op, &layer, &fonts, &images);
        }
    }

    let mut buf = Vec::new();
    {
        let mut writer = BufWriter::new(Cursor::new(&mut buf));
        pdf.save(&mut writer)
            .map_err(|e| RenderError::Serialization(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| RenderError::Serialization(e.to_string()))?;
    }

    tracing::debug!(pages = doc.pages.len(), bytes = buf.len(), "wrote PDF");
    Ok(buf)
}

// ============================================================================
// FONTS
// ============================================================================

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }
}

fn add_font(pdf: &PdfDocumentReference, font: &LoadedFont, face: FontFace) -> Result<IndirectFontRef, RenderError> {
    let result = match &font.source {
        FontSource::File(data) => pdf.add_external_font(Cursor::new(data.as_slice())),
        FontSource::Helvetica => pdf.add_builtin_font(match face {
            FontFace::Regular => BuiltinFont::Helvetica,
            FontFace::Bold => BuiltinFont::HelveticaBold,
        }),
    };

    result.map_err(|e| RenderError::AssetLoad {
        path: format!("{:?} face", face),
        reason: e.to_string(),
    })
}

// ============================================================================
// DRAWING
// ============================================================================

/// Canvas y (from the top) to PDF y (from the bottom).
fn flip(y: f32) -> f32 {
    PAGE_HEIGHT - y
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(flip(y))), false)
}

fn draw_op(op: &DrawOp, layer: &PdfLayerReference, fonts: &Fonts, images: &[DecodedImage]) {
    match op {
        DrawOp::Text { x, baseline, text, face, size, color } => {
            set_fill_color(layer, color);
            layer.use_text(text.as_str(), *size, Mm(*x), Mm(flip(*baseline)), fonts.get(*face));
        }
        DrawOp::Rect { x, y, w, h, mode, fill, stroke, line_width } => {
            set_fill_color(layer, fill);
            set_stroke_color(layer, stroke);
            layer.set_outline_thickness(line_width / PT_TO_MM);
            let points = vec![
                point(*x, *y),
                point(x + w, *y),
                point(x + w, y + h),
                point(*x, y + h),
            ];
            draw_shape(layer, points, *mode);
        }
        DrawOp::Line { x1, y1, x2, y2, color, line_width } => {
            set_stroke_color(layer, color);
            layer.set_outline_thickness(line_width / PT_TO_MM);
            layer.add_line(Line {
                points: vec![point(*x1, *y1), point(*x2, *y2)],
                is_closed: false,
            });
        }
        DrawOp::Polygon { points, mode, fill, stroke } => {
            set_fill_color(layer, fill);
            set_stroke_color(layer, stroke);
            let points = points.iter().map(|(x, y)| point(*x, *y)).collect();
            draw_shape(layer, points, *mode);
        }
        DrawOp::Image { id, x, y, w, h } => {
            if let Some(img) = images.get(id.0) {
                add_image(layer, img, *x, *y, *w, *h);
            } else {
                tracing::warn!(id = id.0, "image op references unknown image");
            }
        }
    }
}

fn draw_shape(layer: &PdfLayerReference, points: Vec<(Point, bool)>, mode: PaintMode) {
    match mode {
        PaintMode::Stroke => layer.add_line(Line { points, is_closed: true }),
        PaintMode::Fill | PaintMode::FillStroke => {
            let polygon = Polygon {
                rings: vec![points],
                mode: if mode == PaintMode::Fill {
                    PdfPaintMode::Fill
                } else {
                    PdfPaintMode::FillStroke
                },
                winding_order: WindingOrder::NonZero,
            };
            layer.add_polygon(polygon);
        }
    }
}

// ============================================================================
// IMAGES
// ============================================================================

struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

fn decode_png(data: &[u8]) -> Result<DecodedImage, RenderError> {
    if data.is_empty() {
        return Err(RenderError::Image("image data is empty".to_string()));
    }

    let img = ::image::load_from_memory(data)
        .map_err(|e| RenderError::Image(format!("failed to decode image (len={}): {}", data.len(), e)))?;

    Ok(DecodedImage {
        width: img.width(),
        height: img.height(),
        rgb: img.to_rgb8().into_raw(),
    })
}

fn add_image(layer: &PdfLayerReference, img: &DecodedImage, x: f32, y: f32, w: f32, h: f32) {
    let image = Image::from(ImageXObject {
        width: Px(img.width as usize),
        height: Px(img.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: false,
        image_data: img.rgb.clone(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    // At 72 DPI the natural size is one point per pixel
    let natural_w = img.width as f32 * PT_TO_MM;
    let natural_h = img.height as f32 * PT_TO_MM;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(flip(y + h))),
            scale_x: Some(w / natural_w),
            scale_y: Some(h / natural_h),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

// ============================================================================
// COLOR HELPERS
// ============================================================================

fn to_rgb(color: &Color) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        None,
    ))
}

fn set_fill_color(layer: &PdfLayerReference, color: &Color) {
    layer.set_fill_color(to_rgb(color));
}

fn set_stroke_color(layer: &PdfLayerReference, color: &Color) {
    layer.set_outline_color(to_rgb(color));
}
