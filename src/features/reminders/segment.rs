//! Clause segmentation for the remind grammar
//!
//! Scans a token sequence for anchor keywords (`at`, `in`, `on`,
//! `tomorrow`), assigns following tokens to each anchor's clause, folds
//! resolved times/dates into a running instant, and reconstructs the
//! leftover tokens as the subject.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Datelike, Days, TimeZone, Timelike};
use chrono_tz::Tz;

use super::resolve::{resolve_date, resolve_time};

/// Keywords that open a clause. Token 0 is the addressee and never scanned.
pub const ANCHORS: [&str; 4] = ["at", "in", "on", "tomorrow"];

/// Per-anchor scan state: the keyword's position, the span of tokens
/// accumulated after it, and whether the clause parsed to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub opened_at: usize,
    pub from: Option<usize>,
    pub to: Option<usize>,
    pub text: String,
    pub finished: bool,
}

impl Clause {
    fn open(opened_at: usize) -> Self {
        Clause {
            opened_at,
            from: None,
            to: None,
            text: String::new(),
            finished: false,
        }
    }
}

/// Result of a successful segmentation.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// The instant accumulated from all finished clauses.
    pub when: DateTime<Tz>,
    /// Tokens not claimed by any clause, excluding the addressee.
    pub subject: String,
    /// Clause states in the order their anchors were encountered.
    pub clauses: Vec<(String, Clause)>,
}

/// One-token lookahead: retry the time parse with the next token appended,
/// to catch forms like "4:20" + "p.m." split across tokens.
fn try_extend(clause_text: &str, next_token: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    resolve_time(&format!("{clause_text} {next_token}"), now)
}

/// Segment `tokens` into anchor clauses and fold them into an instant.
///
/// Returns `None` when no `at` or `in` clause ever finishes; the caller
/// treats that as "need an at or in clause". An abandoned clause (one that
/// never parses) reverts to subject text, e.g. "yodel at turtles".
pub fn segment(tokens: &[String], now: DateTime<Tz>) -> Option<Segmentation> {
    let mut clauses: Vec<(String, Clause)> = Vec::new();
    let mut when = now;
    let mut cur_kw: Option<String> = None;
    let mut skip_next = false;

    for (index, token) in tokens.iter().enumerate() {
        if index == 0 {
            continue;
        }
        if skip_next {
            skip_next = false;
            continue;
        }
        let word = token.to_lowercase();

        if ANCHORS.contains(&word.as_str()) {
            cur_kw = Some(word.clone());
            if word == "tomorrow" {
                // Single-token clause, finished on sight. Re-encountering it
                // overwrites the earlier entry in place.
                let clause = Clause {
                    opened_at: index,
                    from: Some(index),
                    to: Some(index + 1),
                    text: word.clone(),
                    finished: true,
                };
                match clauses.iter_mut().find(|(k, _)| *k == word) {
                    Some(entry) => entry.1 = clause,
                    None => clauses.push((word, clause)),
                }
                if when.date_naive() == now.date_naive() {
                    when = when.checked_add_days(Days::new(1))?;
                }
            } else if !clauses.iter().any(|(k, _)| *k == word) {
                clauses.push((word, Clause::open(index)));
            }
            continue;
        }

        let Some(kw) = cur_kw.clone() else { continue };
        // A removed (abandoned) clause no longer collects tokens.
        let Some(pos) = clauses.iter().position(|(k, _)| *k == kw) else {
            continue;
        };
        if clauses[pos].1.finished {
            continue;
        }

        let from = *clauses[pos].1.from.get_or_insert(index);
        clauses[pos].1.to = Some(index + 1);
        let text = tokens[from..index + 1].join(" ");
        clauses[pos].1.text = text.clone();

        let date = resolve_date(&text, now);
        let mut time = resolve_time(&text, now);
        let lookahead = tokens
            .get(index + 1)
            .and_then(|next| try_extend(&text, next, now));

        if (kw == "at" || kw == "in") && (time.is_some() || lookahead.is_some()) {
            clauses[pos].1.finished = true;
            if lookahead.is_some() {
                time = lookahead;
                skip_next = true;
                clauses[pos].1.to = Some(index + 2);
            }
            let Some(t) = time else { continue };
            if t.date_naive() != now.date_naive() && when.date_naive() == now.date_naive() {
                // The time resolver's own rollover moved the date while no
                // other clause had; keep its full instant.
                when = t;
            } else {
                when = when
                    .timezone()
                    .with_ymd_and_hms(
                        when.year(),
                        when.month(),
                        when.day(),
                        t.hour(),
                        t.minute(),
                        t.second(),
                    )
                    .single()?;
            }
        } else if kw == "on" && date.is_some() {
            clauses[pos].1.finished = true;
            let Some(d) = date else { continue };
            when = when
                .timezone()
                .with_ymd_and_hms(
                    d.year(),
                    d.month(),
                    d.day(),
                    when.hour(),
                    when.minute(),
                    when.second(),
                )
                .single()?;
        } else if kw == "in" && index + 1 - from < 2 {
            // Not enough tokens yet for "<N> <unit>"; keep collecting.
        } else {
            // Couldn't parse; the keyword was ordinary subject text.
            clauses.remove(pos);
        }
    }

    if !clauses
        .iter()
        .any(|(k, c)| (k == "at" || k == "in") && c.finished)
    {
        return None;
    }

    let mut blanked = vec![false; tokens.len()];
    for (_, clause) in &clauses {
        let end = match (clause.from, clause.to) {
            (None, _) => clause.opened_at + 1,
            (Some(f), None) => f + 1,
            (_, Some(t)) => t,
        };
        for slot in blanked
            .iter_mut()
            .take(end.min(tokens.len()))
            .skip(clause.opened_at)
        {
            *slot = true;
        }
    }
    let subject = tokens
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, _)| !blanked[*i])
        .map(|(_, w)| w.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(Segmentation {
        when,
        subject,
        clauses,
    })
}
