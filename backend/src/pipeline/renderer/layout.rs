//! Page content decided as plain data, before anything is drawn.
//!
//! Each builder applies the suppression and fallback rules (blank fields drop
//! their whole block, missing titles fall back to `Canto N`) so the PDF pass
//! only has to lay out what is here.

use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;
use common::model::event::{non_blank, EventSnapshot, PieceEntry};

pub const PROGRAM_SUBTITLE: &str = "Programa Musical";
pub const SPECIAL_INSTRUCTIONS_TITLE: &str = "Instrucciones Especiales";
pub const PROGRAM_NOTES_TITLE: &str = "Notas del Programa";
pub const PERFORMANCE_NOTES_TITLE: &str = "Notas de interpretación";
pub const GENERAL_NOTES_TITLE: &str = "Notas generales";
pub const NO_ATTACHMENT_NOTICE: &str =
    "No hay archivo de letra o partitura adjunto para este canto.";
pub const FOOTER_BRAND: &str = "Sistema de Gestión Coral";

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub title: &'static str,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverLayout {
    pub title: String,
    /// Long localized date, e.g. `domingo, 1 de junio de 2025`.
    pub schedule: Option<String>,
    pub left: Vec<Field>,
    pub right: Vec<Field>,
    pub boxes: Vec<TextBox>,
    pub generated_on: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramLayout {
    pub title: String,
    pub subtitle: &'static str,
    pub rows: Vec<ProgramRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRow {
    pub number: u32,
    pub group_label: Option<String>,
    pub title: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderLayout {
    pub title: String,
    pub performance_notes: Option<String>,
    pub general_notes: Option<String>,
    pub notice: &'static str,
}

/// Splits an instant into the localized long date and `HH:MM` in `tz`.
pub fn local_date_and_time(at: DateTime<Utc>, tz: Tz) -> (String, String) {
    let local = at.with_timezone(&tz);
    let date = local
        .format_localized("%A, %-d de %B de %Y", Locale::es_ES)
        .to_string();
    let time = local.format("%H:%M").to_string();
    (date, time)
}

fn field(label: &'static str, value: Option<&str>) -> Option<Field> {
    value.map(|value| Field {
        label,
        value: value.to_string(),
    })
}

impl CoverLayout {
    pub fn build(event: &EventSnapshot, tz: Tz, generated_at: DateTime<Utc>) -> CoverLayout {
        let (schedule, time) = match event.starts_at {
            Some(at) => {
                let (date, time) = local_date_and_time(at, tz);
                (Some(date), Some(time))
            }
            None => (None, None),
        };

        let left = [
            field("Hora", time.as_deref()),
            field("Lugar", non_blank(&event.venue)),
            field("Descripción", non_blank(&event.description)),
        ];

        let choir = event.choir.as_ref().map(|c| c.name.trim()).filter(|n| !n.is_empty());
        let vestment = event.vestment_requirement.as_ref();
        let right = [
            field("Coro", choir),
            field(
                "Vestimenta",
                vestment.map(|v| v.name.trim()).filter(|n| !n.is_empty()),
            ),
            field(
                "Detalle de vestimenta",
                vestment.and_then(|v| non_blank(&v.description)),
            ),
        ];

        let boxes = [
            (SPECIAL_INSTRUCTIONS_TITLE, non_blank(&event.special_instructions)),
            (PROGRAM_NOTES_TITLE, non_blank(&event.program_notes)),
        ]
        .into_iter()
        .filter_map(|(title, body)| {
            body.map(|body| TextBox {
                title,
                body: body.to_string(),
            })
        })
        .collect();

        CoverLayout {
            title: event.display_name().to_string(),
            schedule,
            left: left.into_iter().flatten().collect(),
            right: right.into_iter().flatten().collect(),
            boxes,
            generated_on: generated_at.with_timezone(&tz).format("%d/%m/%Y").to_string(),
        }
    }

    pub fn has_box(&self, title: &str) -> bool {
        self.boxes.iter().any(|b| b.title == title)
    }
}

impl ProgramLayout {
    pub fn build(event: &EventSnapshot) -> ProgramLayout {
        let rows = event
            .ordered_pieces()
            .into_iter()
            .map(|(position, piece)| ProgramRow {
                number: piece.display_number(position),
                group_label: non_blank(&piece.liturgical_moment).map(str::to_string),
                title: piece.display_title(position),
                notes: non_blank(&piece.notes).map(str::to_string),
            })
            .collect();
        ProgramLayout {
            title: event.display_name().to_string(),
            subtitle: PROGRAM_SUBTITLE,
            rows,
        }
    }
}

impl ProgramRow {
    /// Title with the bracketed grouping label in front, when there is one.
    pub fn heading(&self) -> String {
        match &self.group_label {
            Some(label) => format!("[{}] {}", label, self.title),
            None => self.title.clone(),
        }
    }

    /// `N. heading`, the row as it reads on the page.
    pub fn label(&self) -> String {
        format!("{}. {}", self.number, self.heading())
    }
}

impl PlaceholderLayout {
    pub fn build(piece: &PieceEntry, position: usize) -> PlaceholderLayout {
        PlaceholderLayout {
            title: piece.display_title(position),
            performance_notes: non_blank(&piece.notes).map(str::to_string),
            general_notes: piece
                .song
                .as_ref()
                .and_then(|song| non_blank(&song.notes))
                .map(str::to_string),
            notice: NO_ATTACHMENT_NOTICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::model::event::{Choir, Song, VestmentRequirement};

    fn misa_dominical() -> EventSnapshot {
        EventSnapshot {
            id: 1,
            name: Some("Misa Dominical".into()),
            // 11:00 in Mexico City
            starts_at: Some(Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap()),
            venue: Some("Templo Mayor".into()),
            special_instructions: Some(String::new()),
            choir: Some(Choir {
                name: "Coro Parroquial".into(),
            }),
            vestment_requirement: Some(VestmentRequirement {
                name: "Túnica blanca".into(),
                description: Some("  ".into()),
            }),
            pieces: vec![
                PieceEntry {
                    performance_order: Some(2),
                    song: Some(Song {
                        id: 2,
                        title: "Santo".into(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                PieceEntry {
                    performance_order: Some(1),
                    song: Some(Song {
                        id: 1,
                        title: "Entrada".into(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn cover_interprets_the_instant_in_the_configured_zone() {
        let cover = CoverLayout::build(
            &misa_dominical(),
            chrono_tz::America::Mexico_City,
            Utc::now(),
        );
        assert_eq!(cover.title, "Misa Dominical");
        let schedule = cover.schedule.unwrap();
        assert!(schedule.contains("1 de junio de 2025"), "{}", schedule);
        assert_eq!(
            cover.left[0],
            Field {
                label: "Hora",
                value: "11:00".into()
            }
        );
    }

    #[test]
    fn empty_blocks_are_suppressed() {
        let cover = CoverLayout::build(&misa_dominical(), chrono_tz::UTC, Utc::now());
        assert!(!cover.has_box(SPECIAL_INSTRUCTIONS_TITLE));
        assert!(cover.boxes.is_empty());
        assert!(cover.left.iter().all(|f| f.label != "Descripción"));
        let right: Vec<&str> = cover.right.iter().map(|f| f.label).collect();
        assert_eq!(right, vec!["Coro", "Vestimenta"]);
    }

    #[test]
    fn filled_instructions_produce_a_box() {
        let mut event = misa_dominical();
        event.special_instructions = Some("Llegar 30 minutos antes".into());
        event.program_notes = Some("Ensayo previo".into());
        let cover = CoverLayout::build(&event, chrono_tz::UTC, Utc::now());
        let titles: Vec<&str> = cover.boxes.iter().map(|b| b.title).collect();
        assert_eq!(titles, vec![SPECIAL_INSTRUCTIONS_TITLE, PROGRAM_NOTES_TITLE]);
    }

    #[test]
    fn program_rows_follow_declared_order() {
        let program = ProgramLayout::build(&misa_dominical());
        let labels: Vec<String> = program.rows.iter().map(ProgramRow::label).collect();
        assert_eq!(labels, vec!["1. Entrada", "2. Santo"]);
        assert_eq!(program.subtitle, "Programa Musical");
    }

    #[test]
    fn program_row_uses_group_label_and_positional_fallback() {
        let event = EventSnapshot {
            pieces: vec![PieceEntry {
                liturgical_moment: Some("Ofertorio".into()),
                notes: Some("Solo de soprano".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let program = ProgramLayout::build(&event);
        assert_eq!(program.title, "Evento sin nombre");
        assert_eq!(program.rows[0].label(), "1. [Ofertorio] Canto 1");
        assert_eq!(program.rows[0].notes.as_deref(), Some("Solo de soprano"));
    }

    #[test]
    fn placeholder_layout_is_deterministic() {
        let piece = PieceEntry {
            notes: Some("Repetir estribillo".into()),
            song: Some(Song {
                id: 3,
                title: "Cordero".into(),
                notes: Some("Tono de Re".into()),
                media: Vec::new(),
            }),
            ..Default::default()
        };
        let first = PlaceholderLayout::build(&piece, 4);
        assert_eq!(first, PlaceholderLayout::build(&piece, 4));
        assert_eq!(first.title, "Cordero");
        assert_eq!(first.performance_notes.as_deref(), Some("Repetir estribillo"));
        assert_eq!(first.general_notes.as_deref(), Some("Tono de Re"));
    }
}
