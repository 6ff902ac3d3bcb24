//! Date-based archive views.
//!
//! [`DateArchiveView`] covers the index, year, month, day and today
//! archives, selected by [`ArchivePeriod`]. [`DateDetailView`] is a detail
//! view whose object must also match the date in the URL.
//!
//! URL dates come from the `year`, `month` and `day` kwargs (or query
//! parameters of the same names). Months may be numbers or three-letter
//! English abbreviations (`jan`, `Feb`, ...).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use django_async_core::{DjangoError, DjangoResult};
use django_async_db::{DatePeriod, FieldType, Lookup, Model, QuerySet, Value};
use django_async_http::{HttpRequest, HttpResponse};
use django_async_template::{Context, Engine};
use http::Method;
use serde_json::{json, Value as JsonValue};

use crate::base::{ContextMixin, TemplateResponseMixin, View};
use crate::detail::{impl_object_view, ObjectOptions, SingleObjectMixin};
use crate::list::MultipleObjectMixin;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Which archive a [`DateArchiveView`] shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivePeriod {
    /// Latest objects first, with the years that have objects.
    Index,
    /// One year, with the months that have objects.
    Year,
    /// One month, with the days that have objects.
    Month,
    /// One day.
    Day,
    /// The current day.
    Today,
}

impl ArchivePeriod {
    const fn template_suffix(self) -> &'static str {
        match self {
            Self::Index => "_archive",
            Self::Year => "_archive_year",
            Self::Month => "_archive_month",
            Self::Day | Self::Today => "_archive_day",
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn date_param<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .kwarg(name)
        .or_else(|| request.get().get(name))
        .filter(|s| !s.is_empty())
}

fn invalid_date(datestr: &str) -> DjangoError {
    DjangoError::NotFound(format!("Invalid date string '{datestr}'"))
}

/// Parses a month given as a number or a three-letter abbreviation.
pub fn parse_month(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let lower = raw.to_ascii_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| *abbr == lower)
        .and_then(|i| u32::try_from(i + 1).ok())
}

fn year_from(request: &HttpRequest) -> DjangoResult<(String, i32)> {
    let raw = date_param(request, "year")
        .ok_or_else(|| DjangoError::NotFound("No year specified".to_string()))?;
    let year = raw.parse::<i32>().map_err(|_| invalid_date(raw))?;
    Ok((raw.to_string(), year))
}

fn month_from(request: &HttpRequest) -> DjangoResult<NaiveDate> {
    let (year_raw, year) = year_from(request)?;
    let raw = date_param(request, "month")
        .ok_or_else(|| DjangoError::NotFound("No month specified".to_string()))?;
    let datestr = format!("{year_raw}-{raw}");
    let month = parse_month(raw).ok_or_else(|| invalid_date(&datestr))?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid_date(&datestr))
}

/// The date named by the `year`, `month` and `day` URL parameters.
pub fn day_from(request: &HttpRequest) -> DjangoResult<NaiveDate> {
    let month_start = month_from(request)?;
    let raw = date_param(request, "day")
        .ok_or_else(|| DjangoError::NotFound("No day specified".to_string()))?;
    let datestr = format!("{}-{}-{raw}", month_start.year(), month_start.month());
    let day = raw.parse::<u32>().map_err(|_| invalid_date(&datestr))?;
    NaiveDate::from_ymd_opt(month_start.year(), month_start.month(), day)
        .ok_or_else(|| invalid_date(&datestr))
}

/// The first day of the period containing `date`.
pub fn period_start(date: NaiveDate, period: DatePeriod) -> NaiveDate {
    match period {
        DatePeriod::Year => date.with_ordinal(1).unwrap_or(date),
        DatePeriod::Month => date.with_day(1).unwrap_or(date),
        DatePeriod::Day => date,
    }
}

/// The first day of the period after the one containing `date`.
pub fn next_period_start(date: NaiveDate, period: DatePeriod) -> Option<NaiveDate> {
    match period {
        DatePeriod::Year => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        DatePeriod::Month if date.month() == 12 => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        DatePeriod::Month => NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1),
        DatePeriod::Day => date.succ_opt(),
    }
}

/// The first day of the period before the one containing `date`.
pub fn previous_period_start(date: NaiveDate, period: DatePeriod) -> Option<NaiveDate> {
    match period {
        DatePeriod::Year => NaiveDate::from_ymd_opt(date.year() - 1, 1, 1),
        DatePeriod::Month if date.month() == 1 => NaiveDate::from_ymd_opt(date.year() - 1, 12, 1),
        DatePeriod::Month => NaiveDate::from_ymd_opt(date.year(), date.month() - 1, 1),
        DatePeriod::Day => date.pred_opt(),
    }
}

fn uses_datetime_field<M: Model>(date_field: &str) -> bool {
    M::meta()
        .get_field(date_field)
        .is_some_and(|f| f.field_type == FieldType::DateTimeField)
}

/// The latest value a date field may hold when future objects are hidden.
fn now_bound<M: Model>(date_field: &str) -> Value {
    if uses_datetime_field::<M>(date_field) {
        Value::DateTime(Local::now().naive_local())
    } else {
        Value::Date(today())
    }
}

fn date_json(date: Option<NaiveDate>) -> JsonValue {
    date.map_or(JsonValue::Null, |d| json!(d))
}

/// An archive of objects by date.
///
/// # Examples
///
/// ```no_run
/// # use django_async_db::{Manager, Model};
/// # fn demo<M: Model>(objects: Manager<M>) {
/// use django_async_views::DateArchiveView;
///
/// let view = DateArchiveView::month("EntryMonthArchive", "published")
///     .queryset(objects.all())
///     .allow_empty(true);
/// # }
/// ```
pub struct DateArchiveView<M: Model> {
    name: String,
    period: ArchivePeriod,
    date_field: String,
    queryset: Option<QuerySet<M>>,
    template_name: Option<String>,
    template_name_suffix: String,
    engine: Option<Arc<Engine>>,
    extra_context: Option<Context>,
    content_type: Option<String>,
    allow_future: bool,
    allow_empty: bool,
    paginate_by: Option<usize>,
    paginate_orphans: usize,
    page_kwarg: String,
    context_object_name: Option<String>,
    ordering: Vec<String>,
    make_object_list: bool,
}

impl<M: Model> DateArchiveView<M> {
    pub fn new(name: &str, period: ArchivePeriod, date_field: &str) -> Self {
        Self {
            name: name.to_string(),
            period,
            date_field: date_field.to_string(),
            queryset: None,
            template_name: None,
            template_name_suffix: period.template_suffix().to_string(),
            engine: None,
            extra_context: None,
            content_type: None,
            allow_future: false,
            allow_empty: false,
            paginate_by: None,
            paginate_orphans: 0,
            page_kwarg: "page".to_string(),
            context_object_name: None,
            ordering: vec![format!("-{date_field}")],
            make_object_list: false,
        }
    }

    pub fn archive_index(name: &str, date_field: &str) -> Self {
        Self::new(name, ArchivePeriod::Index, date_field)
    }

    pub fn year(name: &str, date_field: &str) -> Self {
        Self::new(name, ArchivePeriod::Year, date_field)
    }

    pub fn month(name: &str, date_field: &str) -> Self {
        Self::new(name, ArchivePeriod::Month, date_field)
    }

    pub fn day(name: &str, date_field: &str) -> Self {
        Self::new(name, ArchivePeriod::Day, date_field)
    }

    pub fn today(name: &str, date_field: &str) -> Self {
        Self::new(name, ArchivePeriod::Today, date_field)
    }

    #[must_use]
    pub fn queryset(mut self, queryset: QuerySet<M>) -> Self {
        self.queryset = Some(queryset);
        self
    }

    #[must_use]
    pub fn template_name(mut self, name: &str) -> Self {
        self.template_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn template_name_suffix(mut self, suffix: &str) -> Self {
        self.template_name_suffix = suffix.to_string();
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: Arc<Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn extra_context(mut self, context: Context) -> Self {
        self.extra_context = Some(context);
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Show objects dated in the future.
    #[must_use]
    pub const fn allow_future(mut self, allow: bool) -> Self {
        self.allow_future = allow;
        self
    }

    /// Render empty archives instead of raising a 404.
    #[must_use]
    pub const fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    #[must_use]
    pub const fn paginate_by(mut self, per_page: usize) -> Self {
        self.paginate_by = Some(per_page);
        self
    }

    #[must_use]
    pub const fn paginate_orphans(mut self, orphans: usize) -> Self {
        self.paginate_orphans = orphans;
        self
    }

    #[must_use]
    pub fn page_kwarg(mut self, kwarg: &str) -> Self {
        self.page_kwarg = kwarg.to_string();
        self
    }

    #[must_use]
    pub fn context_object_name(mut self, name: &str) -> Self {
        self.context_object_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn ordering<S: AsRef<str>>(mut self, terms: &[S]) -> Self {
        self.ordering = terms.iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    /// For the year archive: list the year's objects, not only its months.
    #[must_use]
    pub const fn make_object_list(mut self, make: bool) -> Self {
        self.make_object_list = make;
        self
    }

    fn nothing_available(&self) -> DjangoError {
        DjangoError::NotFound(format!("No {} available", M::meta().verbose_name_plural))
    }

    /// The base query set narrowed by `lookups`, without future objects
    /// unless allowed. Fails when empty and empty archives are not allowed.
    async fn dated_queryset(
        &self,
        request: &HttpRequest,
        lookups: Vec<Lookup>,
    ) -> DjangoResult<QuerySet<M>> {
        let mut qs = self.get_queryset(request).await?;
        for lookup in lookups {
            qs = qs.filter(lookup);
        }
        if !self.allow_future {
            qs = qs.filter(Lookup::lte(&self.date_field, now_bound::<M>(&self.date_field)));
        }
        if !self.allow_empty {
            let is_empty = if self.paginate_by.is_some() {
                !qs.exists().await?
            } else {
                qs.count().await? == 0
            };
            if is_empty {
                return Err(self.nothing_available());
            }
        }
        Ok(qs)
    }

    async fn date_list(
        &self,
        qs: &QuerySet<M>,
        period: DatePeriod,
        descending: bool,
    ) -> DjangoResult<Vec<NaiveDate>> {
        let dates = qs.dates(&self.date_field, period, descending).await?;
        if dates.is_empty() && !self.allow_empty {
            return Err(self.nothing_available());
        }
        Ok(dates)
    }

    /// The start of the next or previous period to link to.
    ///
    /// With `allow_empty` this is simply the adjacent period (unless it
    /// lies in the hidden future). Otherwise it is the nearest period that
    /// has objects.
    async fn adjacent_period(
        &self,
        request: &HttpRequest,
        date: NaiveDate,
        period: DatePeriod,
        previous: bool,
    ) -> DjangoResult<Option<NaiveDate>> {
        if self.allow_empty {
            let result = if previous {
                previous_period_start(date, period)
            } else {
                next_period_start(date, period)
            };
            return Ok(result.filter(|d| self.allow_future || *d <= today()));
        }

        let field = self.date_field.as_str();
        let mut qs = self.get_queryset(request).await?;
        if previous {
            qs = qs
                .filter(Lookup::lt(field, period_start(date, period)))
                .order_by(&[format!("-{field}")]);
        } else {
            let Some(next) = next_period_start(date, period) else {
                return Ok(None);
            };
            qs = qs.filter(Lookup::gte(field, next)).order_by(&[field]);
        }
        if !self.allow_future {
            qs = qs.filter(Lookup::lte(field, now_bound::<M>(field)));
        }
        let first = qs.slice(0, Some(1)).fetch_all().await?.into_iter().next();
        Ok(first
            .and_then(|obj| obj.field_value(field))
            .and_then(|v| v.as_date())
            .map(|d| period_start(d, period)))
    }

    /// Resolves the archive's objects, `date_list` and extra context.
    async fn dated_items(
        &self,
        request: &HttpRequest,
    ) -> DjangoResult<(Option<Vec<NaiveDate>>, QuerySet<M>, Context)> {
        let field = self.date_field.as_str();
        let mut extra = Context::new();
        match self.period {
            ArchivePeriod::Index => {
                let qs = self.dated_queryset(request, Vec::new()).await?;
                let date_list = self.date_list(&qs, DatePeriod::Year, true).await?;
                let qs = if date_list.is_empty() { qs.none() } else { qs };
                Ok((Some(date_list), qs, extra))
            }
            ArchivePeriod::Year => {
                let (raw, year) = year_from(request)?;
                let since = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| invalid_date(&raw))?;
                let until =
                    next_period_start(since, DatePeriod::Year).ok_or_else(|| invalid_date(&raw))?;
                let qs = self
                    .dated_queryset(request, vec![Lookup::gte(field, since), Lookup::lt(field, until)])
                    .await?;
                let date_list = self.date_list(&qs, DatePeriod::Month, false).await?;
                let qs = if self.make_object_list { qs } else { qs.none() };
                extra.insert("year".into(), json!(since));
                extra.insert(
                    "next_year".into(),
                    date_json(self.adjacent_period(request, since, DatePeriod::Year, false).await?),
                );
                extra.insert(
                    "previous_year".into(),
                    date_json(self.adjacent_period(request, since, DatePeriod::Year, true).await?),
                );
                Ok((Some(date_list), qs, extra))
            }
            ArchivePeriod::Month => {
                let since = month_from(request)?;
                let until = next_period_start(since, DatePeriod::Month)
                    .ok_or_else(|| invalid_date(&since.to_string()))?;
                let qs = self
                    .dated_queryset(request, vec![Lookup::gte(field, since), Lookup::lt(field, until)])
                    .await?;
                let date_list = self.date_list(&qs, DatePeriod::Day, false).await?;
                extra.insert("month".into(), json!(since));
                extra.insert(
                    "next_month".into(),
                    date_json(self.adjacent_period(request, since, DatePeriod::Month, false).await?),
                );
                extra.insert(
                    "previous_month".into(),
                    date_json(self.adjacent_period(request, since, DatePeriod::Month, true).await?),
                );
                Ok((Some(date_list), qs, extra))
            }
            ArchivePeriod::Day | ArchivePeriod::Today => {
                let date = if self.period == ArchivePeriod::Today {
                    today()
                } else {
                    day_from(request)?
                };
                let until = date.succ_opt().ok_or_else(|| invalid_date(&date.to_string()))?;
                let qs = self
                    .dated_queryset(request, vec![Lookup::gte(field, date), Lookup::lt(field, until)])
                    .await?;
                extra.insert("day".into(), json!(date));
                extra.insert(
                    "previous_day".into(),
                    date_json(self.adjacent_period(request, date, DatePeriod::Day, true).await?),
                );
                extra.insert(
                    "next_day".into(),
                    date_json(self.adjacent_period(request, date, DatePeriod::Day, false).await?),
                );
                extra.insert(
                    "previous_month".into(),
                    date_json(self.adjacent_period(request, date, DatePeriod::Month, true).await?),
                );
                extra.insert(
                    "next_month".into(),
                    date_json(self.adjacent_period(request, date, DatePeriod::Month, false).await?),
                );
                Ok((None, qs, extra))
            }
        }
    }

    async fn archive(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let (date_list, qs, mut extra) = self.dated_items(&request).await?;
        extra.insert(
            "date_list".into(),
            date_list.map_or(JsonValue::Null, |dates| json!(dates)),
        );
        let template_names = self.get_list_template_names(&qs)?;
        let context = self.get_list_context_data(&request, qs, extra).await?;
        self.render_to_response(template_names, context)
    }
}

#[async_trait]
impl<M: Model> View for DateArchiveView<M> {
    fn view_name(&self) -> &str {
        &self.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        self.archive(request).await
    }
}

impl<M: Model> ContextMixin for DateArchiveView<M> {
    fn extra_context(&self) -> Option<&Context> {
        self.extra_context.as_ref()
    }
}

impl<M: Model> TemplateResponseMixin for DateArchiveView<M> {
    fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    fn template_engine(&self) -> Option<&Engine> {
        self.engine.as_deref()
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl<M: Model> MultipleObjectMixin for DateArchiveView<M> {
    type List = QuerySet<M>;

    fn queryset(&self) -> Option<&QuerySet<M>> {
        self.queryset.as_ref()
    }

    fn allow_empty(&self) -> bool {
        self.allow_empty
    }

    fn paginate_by(&self) -> Option<usize> {
        self.paginate_by
    }

    fn paginate_orphans(&self) -> usize {
        self.paginate_orphans
    }

    fn page_kwarg(&self) -> &str {
        &self.page_kwarg
    }

    /// The index archive calls its list `latest`.
    fn context_object_name(&self) -> Option<&str> {
        match (&self.context_object_name, self.period) {
            (Some(name), _) => Some(name.as_str()),
            (None, ArchivePeriod::Index) => Some("latest"),
            (None, _) => None,
        }
    }

    fn ordering(&self) -> &[String] {
        &self.ordering
    }

    fn template_name_suffix(&self) -> &str {
        &self.template_name_suffix
    }
}

/// A detail view whose object must fall on the date given by the URL's
/// `year`, `month` and `day`.
pub struct DateDetailView<M: Model> {
    opts: ObjectOptions<M>,
    date_field: String,
    allow_future: bool,
}

impl<M: Model> DateDetailView<M> {
    pub fn new(name: &str, date_field: &str) -> Self {
        Self {
            opts: ObjectOptions::new(name, "_detail"),
            date_field: date_field.to_string(),
            allow_future: false,
        }
    }

    #[must_use]
    pub const fn allow_future(mut self, allow: bool) -> Self {
        self.allow_future = allow;
        self
    }

    async fn get_dated_object(&self, request: &HttpRequest) -> DjangoResult<M> {
        let meta = M::meta();
        let date = day_from(request)?;
        if !self.allow_future && date > today() {
            return Err(DjangoError::NotFound(format!(
                "Future {} not available because {}.allow_future is False.",
                meta.verbose_name_plural,
                self.view_name()
            )));
        }
        let object = self.get_object(request).await?;
        let object_date = object
            .field_value(&self.date_field)
            .and_then(|v| v.as_date());
        if object_date == Some(date) {
            Ok(object)
        } else {
            Err(DjangoError::NotFound(format!(
                "No {} found matching the query",
                meta.verbose_name
            )))
        }
    }
}

impl_object_view!(DateDetailView);

#[async_trait]
impl<M: Model> View for DateDetailView<M> {
    fn view_name(&self) -> &str {
        &self.opts.name
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET]
    }

    async fn get(&self, request: HttpRequest) -> DjangoResult<HttpResponse> {
        let object = self.get_dated_object(&request).await?;
        let template_names = self.get_object_template_names(Some(&object))?;
        let context = self
            .get_object_context_data(&request, Some(&object), Context::new())
            .await?;
        self.render_to_response(template_names, context)
    }
}
