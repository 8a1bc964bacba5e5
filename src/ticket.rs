//! E-ticket composition.
//!
//! Lays out a ticket as a header, a QR code pointing at the stored document,
//! a booking summary, one fixed-height block per flight segment and a closing
//! terms block. Segment and terms blocks are never split across pages.

use crate::assets::{FontAssets, FontFace};
use crate::canvas::{Canvas, Color, Cursor, Document, PaintMode, ELLIPSIS, MARGIN_LEFT, MARGIN_RIGHT, PAGE_WIDTH};
use crate::dash::{dashed_line, GAP_LENGTH, MARK_SIZE};
use crate::error::RenderError;
use crate::model::{or_not_available, Adult, Leg, Segment, Ticket};
use crate::pagination::ensure_room;
use crate::pdf;
use crate::qr::{CodeImageEncoder, ErrorCorrection};
use crate::timestamp::Timestamp;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Vertical space taken by one segment block, gap included.
pub const SEGMENT_BLOCK_HEIGHT: f32 = 50.0;
/// Height of the bordered route table inside a segment block.
const TABLE_HEIGHT: f32 = 30.0;
const MEAL_LINE_HEIGHT: f32 = 3.5;

const RIGHT_EDGE: f32 = PAGE_WIDTH - MARGIN_RIGHT;
const QR_PIXELS: u32 = 512;
const QR_X: f32 = 170.0;
const QR_Y: f32 = 12.0;
const QR_SIZE: f32 = 35.0;
/// Where the summary block starts.
const SUMMARY_TOP: f32 = 21.0;

const ADVISORY: &str = "Please verify flight times prior to departure";
const TERMS_HEADING: &str = "TERMS AND CONDITIONS";
const TERMS_LINE_HEIGHT: f32 = 3.0;
const TERMS: &str = "If air carriage is provided for hereon, this document must be exchanged for a ticket and at such time prior to departure as may be required by the rules and regulations of the carrier to whom the document is directed.\n\n\
If this document is issued in respect to baggage, the passenger must also have a passenger ticket and baggage check, since this document is not the baggage check described by Article 4 of The Hague Protocol or The Warsaw Convention as amended by the Hague Protocol, 1955 or the Baggage Identification Tag described by Article 3 of the Montreal Convention 1999.\n\n\
This document and any carriage or services for which it provides are subject to the currently effective and applicable tariffs, conditions of carriage, rules and regulations of the issuer and of the carrier to whom it is directed and of any carrier performing carriage or services under the ticket or tickets issued in exchange for this order, and to all the terms and conditions under which non-air carriage services are arranged, offered or provided, as well as the laws of the country wherein these services are arranged, offered or provided.\n\n\
In issuing this document, the issuer acts only as agent for the carrier or carriers furnishing the carriage or the person arranging or supplying the services described hereon and the issuer shall not be liable for any loss, injury, damage or delay which is occasioned by such carrier or person, or which results from such carrier or person performing or failing to perform the carriage or other services, or from such carrier or person failing to honour this document.\n\n\
The honouring carrier or person providing services reserves the right to obtain authorisation from the issuing carrier prior to honouring this document.\n\n\
The use of the term issuer, carrier or person includes all owners, subsidiaries and affiliates of such issuer, carrier or person and any person with whom such issuer, carrier or person has contracted to perform the carriage or services provided for hereon.\n\n\
The acceptance of this document by the person named on the face hereof, or by the person purchasing this document on behalf of such named person, shall be deemed to be consent to and acceptance by such person or persons of these conditions.";

// ============================================================================
// PUBLIC API
// ============================================================================

/// Laid-out pages plus the fields that fell back to a default value.
#[derive(Debug)]
pub struct Composition {
    pub document: Document,
    /// One entry per timestamp that could not be parsed
    pub degraded: Vec<String>,
}

#[derive(Debug)]
pub struct RenderedTicket {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub degraded: Vec<String>,
}

/// Lay out the ticket for one passenger without serializing it.
pub fn compose(
    ticket: &Ticket,
    passenger: &Adult,
    code_url: &str,
    fonts: &FontAssets,
    encoder: &dyn CodeImageEncoder,
) -> Result<Composition, RenderError> {
    let (canvas, cursor) = Canvas::new(fonts);
    let mut composer = Composer {
        canvas,
        ticket,
        passenger,
        degraded: Vec::new(),
    };

    let cursor = composer.header(cursor);
    let cursor = composer.code_image(cursor, code_url, encoder)?;
    let mut cursor = composer.summary(cursor);

    for (leg_index, leg) in ticket.itineraries.iter().enumerate() {
        if leg.segments.is_empty() {
            tracing::debug!(leg = leg_index, "skipping leg without segments");
            continue;
        }
        for segment in &leg.segments {
            cursor = ensure_room(&mut composer.canvas, cursor, SEGMENT_BLOCK_HEIGHT);
            cursor = composer.segment(cursor, leg, segment);
        }
    }

    composer.terms(cursor);

    Ok(Composition {
        document: composer.canvas.finish(),
        degraded: composer.degraded,
    })
}

/// Lay out and serialize the ticket for one passenger.
pub fn render(
    ticket: &Ticket,
    passenger: &Adult,
    code_url: &str,
    fonts: &FontAssets,
    encoder: &dyn CodeImageEncoder,
) -> Result<RenderedTicket, RenderError> {
    let composition = compose(ticket, passenger, code_url, fonts, encoder)?;
    let title = format!("Ticket {} - {}", ticket.id, passenger.full_name());
    let bytes = pdf::write_document(&composition.document, fonts, &title)?;

    tracing::info!(
        ticket = ticket.id,
        passenger = %passenger.full_name(),
        pages = composition.document.page_count(),
        bytes = bytes.len(),
        "rendered ticket"
    );

    Ok(RenderedTicket {
        bytes,
        page_count: composition.document.page_count(),
        degraded: composition.degraded,
    })
}

// ============================================================================
// COMPOSER
// ============================================================================

struct Composer<'a> {
    canvas: Canvas<'a>,
    ticket: &'a Ticket,
    passenger: &'a Adult,
    degraded: Vec<String>,
}

impl<'a> Composer<'a> {
    fn timestamp(&mut self, raw: &str, field: &str) -> Timestamp {
        let ts = Timestamp::parse(raw);
        if ts.is_defaulted() {
            self.degraded.push(format!("{}: {:?}", field, raw));
        }
        ts
    }

    /// Text cell at an absolute position in the given font.
    fn text(&mut self, cursor: Cursor, x: f32, y: f32, face: FontFace, size: f32, text: &str) -> Cursor {
        let cursor = cursor.at(x, y).with_font(face, size);
        self.canvas.cell(cursor, 0.0, 4.0, text)
    }

    fn triangle(&mut self, cursor: Cursor, x: f32, y: f32, width: f32, height: f32) -> Cursor {
        let cursor = cursor.with_fill(Color::BLACK);
        self.canvas.polygon(
            cursor,
            &[(x, y), (x + width, y + height / 2.0), (x, y + height)],
            PaintMode::Fill,
        )
    }

    fn header(&mut self, cursor: Cursor) -> Cursor {
        let ticket = self.ticket;
        let start_raw = ticket.first_segment().map_or("", |s| s.departure_time.as_str());
        let end_raw = ticket.last_segment().map_or("", |s| s.arrival_time.as_str());
        let start = self.timestamp(start_raw, "trip start");
        let end = self.timestamp(end_raw, "trip end");

        let header = format!(
            "{}  {}  {} - {}",
            start.date(),
            end.date(),
            ticket.origin(),
            ticket.destination()
        )
        .to_uppercase();

        let cursor = cursor
            .at(MARGIN_LEFT, 7.0)
            .with_font(FontFace::Bold, 13.0)
            .with_colors(Color::BLACK, Color::BLACK, Color::BLACK);
        let header_width = self.canvas.text_width(&cursor, &header);
        let start_width = self.canvas.text_width(&cursor, &start.date());
        self.canvas.cell(cursor, 0.0, 6.0, &header);

        // Marker sits in the gap between the two dates
        let marker_x = MARGIN_LEFT + 1.0 + start_width + 0.3;
        let cursor = self.triangle(cursor, marker_x, 8.0, 1.6, 3.0);

        let cursor = cursor.at(MARGIN_LEFT + header_width + 4.0, 7.3).with_font(FontFace::Regular, 10.0);
        self.canvas.cell(cursor, 0.0, 6.0, "TRIP");

        let cursor = self.canvas.line(cursor, MARGIN_LEFT, 13.0, QR_X - 5.0, 13.0);
        cursor.at(MARGIN_LEFT, SUMMARY_TOP)
    }

    fn code_image(&mut self, cursor: Cursor, code_url: &str, encoder: &dyn CodeImageEncoder) -> Result<Cursor, RenderError> {
        let png = encoder.encode(code_url, ErrorCorrection::Medium, QR_PIXELS)?;
        let id = self.canvas.register_image(png);
        Ok(self.canvas.image(cursor, id, QR_X, QR_Y, QR_SIZE, QR_SIZE))
    }

    fn summary(&mut self, cursor: Cursor) -> Cursor {
        let ticket = self.ticket;
        let name = format!("{}/{}", self.passenger.first_name, self.passenger.last_name).to_uppercase();
        let price = [ticket.price.trim(), ticket.currency.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        let lines = [
            "PREPARED FOR".to_string(),
            name,
            format!("RESERVATION CODE     {}", ticket.id),
            "PARTIAL PREPAYMENT     NONE".to_string(),
            format!("FINAL PRICE: {} (taxes included)", price),
        ];

        let mut cursor = cursor
            .with_font(FontFace::Regular, 11.0)
            .with_text_color(Color::BLACK);
        for line in &lines {
            cursor = cursor.at_x(MARGIN_LEFT);
            self.canvas.cell(cursor, 0.0, 4.0, line);
            cursor = cursor.at(MARGIN_LEFT, cursor.y + 4.5);
        }

        // Leave room below the QR code before the first segment
        cursor.at(MARGIN_LEFT, (cursor.y + 7.5).max(QR_Y + QR_SIZE + 4.0))
    }

    fn segment(&mut self, cursor: Cursor, leg: &Leg, segment: &Segment) -> Cursor {
        let top = cursor.y;
        let departure = self.timestamp(&segment.departure_time, "departure");
        let arrival = self.timestamp(&segment.arrival_time, "arrival");

        let cursor = cursor
            .with_colors(Color::BLACK, Color::BLACK, Color::BLACK)
            .with_line_width(0.2);

        // Headline
        let cursor = self.canvas.line(cursor, MARGIN_LEFT, top, RIGHT_EDGE, top);
        let cursor = self.triangle(cursor, MARGIN_LEFT, top + 1.5, 2.0, 3.0);
        let headline = format!("DEPARTURE: {}", departure.long_date().to_uppercase());
        let cursor = cursor.at(MARGIN_LEFT + 3.0, top + 1.0).with_font(FontFace::Bold, 10.0);
        let headline_width = self.canvas.text_width(&cursor, &headline);
        self.canvas.cell(cursor, 0.0, 5.0, &headline);
        let cursor = cursor
            .at(MARGIN_LEFT + 3.0 + headline_width + 2.0, top + 1.0)
            .with_font(FontFace::Regular, 8.0)
            .with_text_color(Color::MUTED);
        self.canvas.cell(cursor, 0.0, 5.0, ADVISORY);
        let cursor = cursor.with_text_color(Color::BLACK);

        let t = top + 7.0;
        let cursor = self.flight_cell(cursor, t, segment);
        let cursor = self.route_cells(cursor, t, leg, segment, &departure, &arrival);
        let cursor = self.passenger_strip(cursor, t + TABLE_HEIGHT);

        cursor.at(MARGIN_LEFT, top + SEGMENT_BLOCK_HEIGHT)
    }

    /// Grey cell on the left: carrier and booking class.
    fn flight_cell(&mut self, cursor: Cursor, t: f32, segment: &Segment) -> Cursor {
        let cursor = cursor.with_fill(Color::GREY);
        let cursor = self.canvas.rect(cursor, MARGIN_LEFT, t, 50.0, TABLE_HEIGHT, PaintMode::Fill);

        let x = MARGIN_LEFT + 2.0;
        let cursor = self.text(cursor, x, t + 1.0, FontFace::Regular, 9.0, "FLIGHT");
        let cursor = self.text(cursor, x, t + 6.0, FontFace::Bold, 12.0, &segment.carrier);
        let cursor = self.text(cursor, x, t + 13.0, FontFace::Regular, 8.0, &segment.carrier_name);
        let class = format!("Class: {}", self.ticket.flight_class);
        let cursor = self.text(cursor, x, t + 17.0, FontFace::Regular, 8.0, &class);
        self.text(cursor, x, t + 21.0, FontFace::Regular, 8.0, "Status: CONFIRMED")
    }

    /// Bordered region: route, aircraft details, meals.
    fn route_cells(
        &mut self,
        cursor: Cursor,
        t: f32,
        leg: &Leg,
        segment: &Segment,
        departure: &Timestamp,
        arrival: &Timestamp,
    ) -> Cursor {
        let (left, details, meals) = (60.0, 140.0, 172.0);
        let bottom = t + TABLE_HEIGHT;

        let cursor = cursor.with_colors(Color::BLACK, Color::BLACK, Color::BLACK);
        let cursor = self.canvas.rect(cursor, left, t, RIGHT_EDGE - left, TABLE_HEIGHT, PaintMode::Stroke);
        let cursor = self.canvas.line(cursor, details, t, details, bottom);
        let cursor = dashed_line(&mut self.canvas, cursor, meals, t, meals, bottom, MARK_SIZE, GAP_LENGTH);
        let cursor = dashed_line(&mut self.canvas, cursor, left + 1.0, t + 14.0, details - 1.0, t + 14.0, MARK_SIZE, GAP_LENGTH);

        // (a) route
        let (from, to) = (left + 2.0, 100.0);
        let cursor = self.text(cursor, from, t + 1.5, FontFace::Bold, 14.0, &segment.departure_airport);
        let cursor = self.triangle(cursor, 86.0, t + 2.5, 3.0, 3.0);
        let cursor = self.text(cursor, to, t + 1.5, FontFace::Bold, 14.0, &segment.arrival_airport);
        let cursor = self.text(cursor, from, t + 8.0, FontFace::Regular, 7.0, &segment.departure_place());
        let cursor = self.text(cursor, to, t + 8.0, FontFace::Regular, 7.0, &segment.arrival_place());

        let cursor = self.text(cursor, from, t + 15.0, FontFace::Regular, 7.0, "Departing At:");
        let cursor = self.text(cursor, to, t + 15.0, FontFace::Regular, 7.0, "Arriving At:");
        let cursor = self.text(cursor, from, t + 19.0, FontFace::Regular, 8.0, &departure.date());
        let cursor = self.text(cursor, to, t + 19.0, FontFace::Regular, 8.0, &arrival.date());
        let cursor = self.text(cursor, from, t + 24.0, FontFace::Bold, 11.0, &departure.time());
        let cursor = self.text(cursor, to, t + 24.0, FontFace::Bold, 11.0, &arrival.time());

        // (b) aircraft details
        let x = details + 1.0;
        let stops = leg.stops.to_string();
        let rows = [
            ("Aircraft:", or_not_available(segment.aircraft.as_deref())),
            ("Distance (in Miles):", or_not_available(segment.distance.as_deref())),
            ("Stop(s):", stops.as_str()),
        ];
        let mut cursor = cursor;
        for (i, (label, value)) in rows.iter().enumerate() {
            let y = t + 1.0 + 9.0 * i as f32;
            cursor = self.text(cursor, x, y, FontFace::Regular, 7.0, label);
            cursor = self.text(cursor, x, y + 3.5, FontFace::Bold, 8.0, value);
        }

        // (c) meals
        let x = meals + 1.0;
        let cursor = self.text(cursor, x, t + 1.0, FontFace::Regular, 7.0, "Meals:");
        let meal = or_not_available(segment.meals.as_deref());
        let top = t + 4.5;
        let cursor = cursor.at(x, top).with_font(FontFace::Bold, 8.0);
        // Whatever does not fit above the table's bottom edge is cut
        let max_lines = ((t + TABLE_HEIGHT - top) / MEAL_LINE_HEIGHT).floor() as usize;
        let lines = self.canvas.wrap_clamped(&cursor, RIGHT_EDGE - x, meal, max_lines);
        if lines.len() == max_lines && lines.last().is_some_and(|l| l.ends_with(ELLIPSIS)) {
            tracing::debug!(carrier = %segment.carrier, "meal description truncated");
        }
        self.canvas.text_lines(cursor, RIGHT_EDGE - x, MEAL_LINE_HEIGHT, &lines)
    }

    /// Grey strip under the table: passenger, seat and booking.
    fn passenger_strip(&mut self, cursor: Cursor, y: f32) -> Cursor {
        let cursor = cursor.with_colors(Color::BLACK, Color::GREY, Color::BLACK);
        let cursor = self.canvas.rect(cursor, MARGIN_LEFT, y, RIGHT_EDGE - MARGIN_LEFT, 8.0, PaintMode::Fill);

        let cursor = cursor.with_fill(Color::BLACK);
        let cursor = dashed_line(&mut self.canvas, cursor, 95.0, y + 0.5, 95.0, y + 7.5, MARK_SIZE, GAP_LENGTH);
        let cursor = dashed_line(&mut self.canvas, cursor, 150.0, y + 0.5, 150.0, y + 7.5, MARK_SIZE, GAP_LENGTH);

        let name = self.passenger.full_name().to_uppercase();
        let cells = [
            (MARGIN_LEFT + 1.0, "Passenger Name:", name.as_str()),
            (96.0, "Seats:", "Check-In Required"),
            (151.0, "Booking:", "CONFIRMED"),
        ];
        let mut cursor = cursor;
        for (x, label, value) in cells {
            cursor = self.text(cursor, x, y, FontFace::Regular, 7.0, label);
            cursor = self.text(cursor, x, y + 3.7, FontFace::Bold, 8.0, value);
        }
        cursor
    }

    fn terms(&mut self, cursor: Cursor) -> Cursor {
        let body = cursor
            .at(MARGIN_LEFT, cursor.y)
            .with_font(FontFace::Regular, 7.0)
            .with_text_color(Color::BLACK);
        let lines = self.canvas.wrap(&body, 0.0, TERMS).len();
        let height = 3.0 + 5.0 + lines as f32 * TERMS_LINE_HEIGHT;

        let cursor = ensure_room(&mut self.canvas, cursor, height);
        let top = cursor.y;
        let cursor = cursor.with_colors(Color::BLACK, Color::BLACK, Color::BLACK);
        let cursor = self.canvas.line(cursor, MARGIN_LEFT, top, RIGHT_EDGE, top);

        let cursor = self.text(cursor, MARGIN_LEFT, top + 2.0, FontFace::Bold, 9.0, TERMS_HEADING);
        let cursor = cursor.at(MARGIN_LEFT, top + 8.0).with_font(FontFace::Regular, 7.0);
        self.canvas.multi_cell(cursor, 0.0, TERMS_LINE_HEIGHT, TERMS)
    }
}
