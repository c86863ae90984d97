use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::{
    date,
    shared::recurrence::{Frequency, RecurrenceRule},
};

impl RecurrenceRule {
    /// Find the unique occurrence containing `search` in
    /// `[occ_start, occ_end)`, if any.
    ///
    /// The anchor interval `[dt_start, dt_end)` fixes both the first
    /// occurrence and the duration carried by every realized one.
    pub fn point_match(
        &self,
        dt_start: DateTime<Tz>,
        dt_end: DateTime<Tz>,
        search: DateTime<Tz>,
    ) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        let freq = self.freq?;
        let duration = (dt_end - dt_start).max(Duration::zero());

        let mut occ = dt_start;
        let mut realized: u32 = 0;

        loop {
            if let Some(until) = self.until {
                if occ.with_timezone(&Utc) > until {
                    return None;
                }
            }
            // Once a whole period starts after the probe, nothing later
            // can contain it.
            if period_floor(freq, &occ, self.wkst) > search {
                return None;
            }

            for candidate in self.period_candidates(freq, &occ) {
                if candidate < dt_start {
                    continue;
                }

                let occ_end = candidate + duration;
                if search >= candidate && search < occ_end {
                    return Some((candidate, occ_end));
                }

                realized += 1;
                if self.count.is_some_and(|count| realized >= count) {
                    return None;
                }
            }

            occ = date::add_by_freq(&occ, freq, self.interval);
        }
    }

    /// Find the first occurrence overlapping `[from, to]` (endpoints
    /// inclusive), if any.
    pub fn window_match(
        &self,
        dt_start: DateTime<Tz>,
        dt_end: DateTime<Tz>,
        from: DateTime<Tz>,
        to: DateTime<Tz>,
    ) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        let freq = self.freq?;
        let duration = (dt_end - dt_start).max(Duration::zero());

        let mut occ = dt_start;

        // Occurrences realized before the window still consume the COUNT
        // budget, so a counted rule is walked exhaustively from its
        // anchor. Without COUNT, whole periods that cannot reach the
        // window are skipped.
        if self.count.is_none() {
            loop {
                let ceiling = period_floor(freq, &date::add_by_freq(&occ, freq, 1), self.wkst);
                if ceiling + duration > from {
                    break;
                }
                occ = date::add_by_freq(&occ, freq, self.interval);
            }
        }

        let mut realized: u32 = 0;

        loop {
            if let Some(until) = self.until {
                if occ.with_timezone(&Utc) > until {
                    return None;
                }
            }
            if period_floor(freq, &occ, self.wkst) > to {
                return None;
            }

            for candidate in self.period_candidates(freq, &occ) {
                if candidate < dt_start {
                    continue;
                }

                let occ_end = candidate + duration;
                if candidate <= to && occ_end >= from {
                    return Some((candidate, occ_end));
                }

                realized += 1;
                if self.count.is_some_and(|count| realized >= count) {
                    return None;
                }
            }

            occ = date::add_by_freq(&occ, freq, self.interval);
        }
    }

    /// The candidate set of the period anchored at `occ`: the times the
    /// `BY…` filters accept, with `BYSETPOS` selection applied, in
    /// chronological order. Candidates carry the anchor's time-of-day in
    /// every position coarser than the frequency step.
    fn period_candidates(&self, freq: Frequency, occ: &DateTime<Tz>) -> Vec<DateTime<Tz>> {
        let mut candidates = Vec::new();
        let mut push = |candidate: Option<DateTime<Tz>>| {
            if let Some(candidate) = candidate {
                if self.matches_filters(&candidate) {
                    candidates.push(candidate);
                }
            }
        };

        match freq {
            Frequency::Secondly => {
                for second in 0..60 {
                    push(occ.with_second(second));
                }
            }
            Frequency::Minutely => {
                for minute in 0..60 {
                    push(occ.with_minute(minute));
                }
            }
            Frequency::Hourly => {
                for hour in 0..24 {
                    push(occ.with_hour(hour));
                }
            }
            Frequency::Daily => push(Some(*occ)),
            Frequency::Weekly => {
                if let Some(start) = date::start_of_week(occ, self.wkst) {
                    for i in 0..7 {
                        let day = start.date_naive() + chrono::Days::new(i);
                        push(date::on_date(occ, day.year(), day.month(), day.day()));
                    }
                }
            }
            Frequency::Monthly => {
                if !self.has_date_filters() {
                    push(Some(*occ));
                } else {
                    for day in 1..=date::days_in_month(occ.year(), occ.month()) {
                        push(date::on_date(occ, occ.year(), occ.month(), day));
                    }
                }
            }
            Frequency::Yearly => {
                if !self.has_date_filters() {
                    push(Some(*occ));
                } else {
                    for month in 1..=12 {
                        for day in 1..=date::days_in_month(occ.year(), month) {
                            push(date::on_date(occ, occ.year(), month, day));
                        }
                    }
                }
            }
        }

        if self.by_set_pos.is_empty() {
            candidates
        } else {
            select_set_pos(&candidates, &self.by_set_pos)
        }
    }

    /// A candidate passes when every non-empty `BY…` list contains its
    /// corresponding field.
    fn matches_filters(&self, t: &DateTime<Tz>) -> bool {
        if !self.by_second.is_empty() && !self.by_second.contains(&t.second()) {
            return false;
        }
        if !self.by_minute.is_empty() && !self.by_minute.contains(&t.minute()) {
            return false;
        }
        if !self.by_hour.is_empty() && !self.by_hour.contains(&t.hour()) {
            return false;
        }
        if !self.by_month.is_empty() && !self.by_month.contains(&t.month()) {
            return false;
        }

        if !self.by_month_day.is_empty() {
            let last = date::days_in_month(t.year(), t.month()) as i32;
            let day = t.day() as i32;
            if !self
                .by_month_day
                .iter()
                .any(|&d| d == day || (d < 0 && last + 1 + d == day))
            {
                return false;
            }
        }

        if !self.by_year_day.is_empty() {
            let last = date::days_in_year(t.year()) as i32;
            let ordinal = t.ordinal() as i32;
            if !self
                .by_year_day
                .iter()
                .any(|&d| d == ordinal || (d < 0 && last + 1 + d == ordinal))
            {
                return false;
            }
        }

        if !self.by_week_no.is_empty()
            && !self.by_week_no.contains(&(t.iso_week().week() as i32))
        {
            return false;
        }

        if !self.by_day.is_empty() {
            let matched = self.by_day.iter().any(|spec| {
                if spec.weekday() != t.weekday() {
                    return false;
                }
                match spec.ordinal() {
                    None => true,
                    Some(n) => self.matches_ordinal(t, n),
                }
            });
            if !matched {
                return false;
            }
        }

        true
    }

    /// Ordinal BYDAY scoping per RFC 5545: nth weekday of the month under
    /// MONTHLY, and under YEARLY when BYMONTH narrows the rule to months;
    /// nth weekday of the year under a plain YEARLY rule. Any other
    /// frequency ignores the ordinal.
    fn matches_ordinal(&self, t: &DateTime<Tz>, n: i32) -> bool {
        match self.freq {
            Some(Frequency::Monthly) => nth_weekday_of_month(t, n),
            Some(Frequency::Yearly) => {
                if self.by_month.is_empty() {
                    nth_weekday_of_year(t, n)
                } else {
                    nth_weekday_of_month(t, n)
                }
            }
            _ => true,
        }
    }

    fn has_date_filters(&self) -> bool {
        !self.by_month.is_empty()
            || !self.by_month_day.is_empty()
            || !self.by_year_day.is_empty()
            || !self.by_week_no.is_empty()
            || !self.by_day.is_empty()
    }
}

/// Whether `t` is the nth occurrence of its weekday within its month
/// (negative n counts from the end).
fn nth_weekday_of_month(t: &DateTime<Tz>, n: i32) -> bool {
    if n > 0 {
        ((t.day() - 1) / 7 + 1) as i32 == n
    } else {
        let last = date::days_in_month(t.year(), t.month());
        -(((last - t.day()) / 7 + 1) as i32) == n
    }
}

/// Whether `t` is the nth occurrence of its weekday within its year.
fn nth_weekday_of_year(t: &DateTime<Tz>, n: i32) -> bool {
    if n > 0 {
        ((t.ordinal() - 1) / 7 + 1) as i32 == n
    } else {
        let last = date::days_in_year(t.year());
        -(((last - t.ordinal()) / 7 + 1) as i32) == n
    }
}

/// Select candidates by 1-based position, negative counting from the
/// end; out-of-range positions are dropped. The selection is returned in
/// chronological order.
fn select_set_pos(candidates: &[DateTime<Tz>], positions: &[i32]) -> Vec<DateTime<Tz>> {
    let n = candidates.len() as i32;
    let mut selected: Vec<DateTime<Tz>> = positions
        .iter()
        .filter_map(|&pos| {
            let idx = if pos > 0 { pos - 1 } else { n + pos };
            if (0..n).contains(&idx) {
                Some(candidates[idx as usize])
            } else {
                None
            }
        })
        .collect();
    selected.sort();

    selected
}

/// The earliest instant a candidate of `occ`'s period can take: the first
/// day (or sub-day unit) of the period, carrying `occ`'s finer fields.
fn period_floor(freq: Frequency, occ: &DateTime<Tz>, wkst: Weekday) -> DateTime<Tz> {
    let floor = match freq {
        Frequency::Secondly => occ.with_second(0),
        Frequency::Minutely => occ.with_minute(0),
        Frequency::Hourly => occ.with_hour(0),
        Frequency::Daily => Some(*occ),
        Frequency::Weekly => date::start_of_week(occ, wkst),
        Frequency::Monthly => date::on_date(occ, occ.year(), occ.month(), 1),
        Frequency::Yearly => date::on_date(occ, occ.year(), 1, 1),
    };

    // Unresolvable wall-clock boundary: a generous lower bound keeps the
    // walk from terminating a period early.
    floor.unwrap_or_else(|| *occ - Duration::days(366))
}
