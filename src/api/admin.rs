//! Library admin pages
//!
//! Staff-only screens over publishers, authors and books:
//! - Index with record counts
//! - Changelists with search, sidebar filters, date hierarchy and paging
//! - Add / change forms (publishers carry an inline book table)
//! - Delete confirmation

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tera::Context;

use super::common::{page_context, render, FormData};
use super::middleware::{AppState, AuthenticatedUser, HtmlError};
use crate::models::{
    Author, BookFilter, DateDrillDown, DateRange, LibraryModel, ListQuery, PagedResult, User,
};
use crate::services::library::inline_field;
use crate::services::validation::checkbox;
use crate::services::{
    AuthorForm, BookForm, DateLink, InlineBookForm, LibraryService, LibraryServiceError,
    PublisherForm, ValidationErrors,
};

pub const SITE_HEADER: &str = "Library Management System";
pub const SITE_TITLE: &str = "Library Admin";
pub const INDEX_TITLE: &str = "Welcome to the Library Dashboard";

/// Upper bound on inline rows read from one submission
const MAX_INLINE_ROWS: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/", get(index))
        .route("/admin/{model}/", get(changelist))
        .route("/admin/{model}/add/", get(add_page).post(add))
        .route("/admin/{model}/{id}/change/", get(change_page).post(change))
        .route("/admin/{model}/{id}/delete/", get(delete_page).post(delete))
}

// ============================================================================
// Shared context
// ============================================================================

#[derive(Debug, Serialize)]
struct ModelMeta {
    slug: &'static str,
    verbose_name: &'static str,
    verbose_name_plural: &'static str,
}

impl From<LibraryModel> for ModelMeta {
    fn from(model: LibraryModel) -> Self {
        Self {
            slug: model.slug(),
            verbose_name: model.verbose_name(),
            verbose_name_plural: model.verbose_name_plural(),
        }
    }
}

fn admin_context(user: &User, page_title: &str) -> Context {
    let mut context = page_context(Some(user));
    context.insert("site_header", SITE_HEADER);
    context.insert("site_title", SITE_TITLE);
    context.insert("page_title", page_title);
    context
}

fn resolve_model(slug: &str) -> Result<LibraryModel, HtmlError> {
    LibraryModel::from_slug(slug).ok_or(HtmlError::NotFound)
}

fn parse_id(raw: &str) -> Result<i64, HtmlError> {
    raw.parse::<i64>().map_err(|_| HtmlError::NotFound)
}

fn changelist_url(model: LibraryModel) -> String {
    format!("/admin/{}/", model.slug())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Index
// ============================================================================

#[derive(Debug, Serialize)]
struct ModelCount {
    slug: &'static str,
    name_plural: &'static str,
    count: i64,
}

/// GET /admin/
async fn index(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Html<String>, HtmlError> {
    let models: Vec<ModelCount> = state
        .library_service
        .counts()
        .await?
        .into_iter()
        .map(|(model, count)| ModelCount {
            slug: model.slug(),
            name_plural: model.verbose_name_plural(),
            count,
        })
        .collect();

    let mut context = admin_context(&user, "Site administration");
    context.insert("index_title", INDEX_TITLE);
    context.insert("models", &models);
    render(&state, "admin/index.html", &context)
}

// ============================================================================
// Changelist
// ============================================================================

/// Changelist query string, kept sorted so links are stable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangelistParams(BTreeMap<String, String>);

impl ChangelistParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Non-empty value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    pub fn search(&self) -> &str {
        self.get("q").unwrap_or("")
    }

    pub fn page(&self) -> i64 {
        self.parse("p").unwrap_or(1).max(1)
    }

    pub fn list_query(&self) -> ListQuery {
        ListQuery::new(Some(self.search()), self.page())
    }

    pub fn book_filter(&self) -> BookFilter {
        BookFilter {
            publisher_id: self.parse("publisher__id__exact"),
            date_range: self.get("publish_date").and_then(DateRange::from_param),
            drill_down: DateDrillDown {
                year: self.parse("publish_date__year"),
                month: self.parse("publish_date__month"),
                day: self.parse("publish_date__day"),
            },
        }
    }

    /// Parameters carried as hidden inputs by the search form
    pub fn preserved(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(k, v)| k.as_str() != "q" && k.as_str() != "p" && !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Query string with `changes` applied; `None` drops the key.
    ///
    /// The page resets unless `changes` sets it.
    pub fn href(&self, changes: &[(&str, Option<String>)]) -> String {
        let mut params = self.0.clone();
        params.remove("p");
        for (key, value) in changes {
            match value {
                Some(value) => {
                    params.insert((*key).to_string(), value.clone());
                }
                None => {
                    params.remove(*key);
                }
            }
        }

        let query: Vec<String> = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("?{}", query.join("&"))
    }
}

#[derive(Debug, Serialize)]
struct Row {
    id: i64,
    cells: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FilterChoice {
    label: String,
    href: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct FilterSpec {
    title: &'static str,
    choices: Vec<FilterChoice>,
}

#[derive(Debug, Serialize)]
struct HrefLink {
    label: String,
    href: String,
}

#[derive(Debug, Serialize)]
struct HierarchySpec {
    back: Option<HrefLink>,
    choices: Vec<HrefLink>,
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%b. %-d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn drill_link(params: &ChangelistParams, link: DateLink) -> HrefLink {
    HrefLink {
        href: params.href(&[
            ("publish_date__year", link.year.map(|v| v.to_string())),
            ("publish_date__month", link.month.map(|v| v.to_string())),
            ("publish_date__day", link.day.map(|v| v.to_string())),
        ]),
        label: link.label,
    }
}

/// One page of rows plus the model-specific extras
struct Listing {
    columns: Vec<&'static str>,
    rows: Vec<Row>,
    total: i64,
    total_pages: i64,
    has_prev: bool,
    has_next: bool,
    filters: Vec<FilterSpec>,
    hierarchy: Option<HierarchySpec>,
}

impl Listing {
    fn new<T>(
        columns: Vec<&'static str>,
        page: PagedResult<T>,
        to_row: impl Fn(T) -> Row,
    ) -> Self {
        let (total, total_pages, has_prev, has_next) =
            (page.total, page.total_pages(), page.has_prev(), page.has_next());
        Self {
            columns,
            rows: page.items.into_iter().map(to_row).collect(),
            total,
            total_pages,
            has_prev,
            has_next,
            filters: Vec::new(),
            hierarchy: None,
        }
    }
}

async fn author_listing(service: &LibraryService, params: &ChangelistParams) -> Result<Listing, HtmlError> {
    let page = service.list_authors(&params.list_query()).await?;
    Ok(Listing::new(vec!["First name", "Last name"], page, |a| Row {
        id: a.id,
        cells: vec![a.first_name, a.last_name],
    }))
}

async fn publisher_listing(service: &LibraryService, params: &ChangelistParams) -> Result<Listing, HtmlError> {
    let selected = params.get("name");
    let page = service.list_publishers(&params.list_query(), selected).await?;
    let mut listing = Listing::new(vec!["Name"], page, |p| Row {
        id: p.id,
        cells: vec![p.name],
    });

    let mut choices = vec![FilterChoice {
        label: "All".to_string(),
        href: params.href(&[("name", None)]),
        selected: selected.is_none(),
    }];
    for name in service.publisher_names().await? {
        choices.push(FilterChoice {
            href: params.href(&[("name", Some(name.clone()))]),
            selected: selected == Some(name.as_str()),
            label: name,
        });
    }
    listing.filters.push(FilterSpec {
        title: "name",
        choices,
    });
    Ok(listing)
}

async fn book_listing(service: &LibraryService, params: &ChangelistParams) -> Result<Listing, HtmlError> {
    let query = params.list_query();
    let filter = params.book_filter();
    let today = Utc::now().date_naive();

    let page = service.list_books(&query, &filter, today).await?;
    let mut listing = Listing::new(
        vec!["Title", "Publish date", "Publisher", "Authors"],
        page,
        |b| Row {
            id: b.id,
            cells: vec![
                b.title,
                display_date(b.publish_date),
                b.publisher_name,
                b.authors,
            ],
        },
    );

    let mut publishers = vec![FilterChoice {
        label: "All".to_string(),
        href: params.href(&[("publisher__id__exact", None)]),
        selected: filter.publisher_id.is_none(),
    }];
    for publisher in service.all_publishers().await? {
        publishers.push(FilterChoice {
            href: params.href(&[("publisher__id__exact", Some(publisher.id.to_string()))]),
            selected: filter.publisher_id == Some(publisher.id),
            label: publisher.name,
        });
    }

    let mut dates = vec![FilterChoice {
        label: "Any date".to_string(),
        href: params.href(&[("publish_date", None)]),
        selected: filter.date_range.is_none(),
    }];
    for range in DateRange::ALL {
        dates.push(FilterChoice {
            label: range.label().to_string(),
            href: params.href(&[("publish_date", Some(range.as_param().to_string()))]),
            selected: filter.date_range == Some(range),
        });
    }

    listing.filters = vec![
        FilterSpec {
            title: "publisher",
            choices: publishers,
        },
        FilterSpec {
            title: "publish date",
            choices: dates,
        },
    ];

    let hierarchy = service.date_hierarchy(&query, &filter, today).await?;
    listing.hierarchy = Some(HierarchySpec {
        back: hierarchy.back.map(|link| drill_link(params, link)),
        choices: hierarchy
            .choices
            .into_iter()
            .map(|link| drill_link(params, link))
            .collect(),
    });
    Ok(listing)
}

/// GET /admin/{model}/
async fn changelist(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, HtmlError> {
    let model = resolve_model(&slug)?;
    let params = ChangelistParams::from_pairs(pairs);
    let service = &state.library_service;

    let listing = match model {
        LibraryModel::Author => author_listing(service, &params).await?,
        LibraryModel::Publisher => publisher_listing(service, &params).await?,
        LibraryModel::Book => book_listing(service, &params).await?,
    };

    let page = params.page();
    let page_title = format!("Select {} to change", model.verbose_name());
    let mut context = admin_context(&user, &page_title);
    context.insert("model", &ModelMeta::from(model));
    context.insert("search", params.search());
    context.insert("preserved", &params.preserved());
    context.insert("columns", &listing.columns);
    context.insert("rows", &listing.rows);
    context.insert("total", &listing.total);
    context.insert("page", &page);
    context.insert("total_pages", &listing.total_pages);
    context.insert("filters", &listing.filters);
    if listing.has_prev {
        context.insert("prev_href", &params.href(&[("p", Some((page - 1).to_string()))]));
    }
    if listing.has_next {
        context.insert("next_href", &params.href(&[("p", Some((page + 1).to_string()))]));
    }
    if let Some(hierarchy) = &listing.hierarchy {
        context.insert("date_hierarchy", hierarchy);
    }
    render(&state, "admin/change_list.html", &context)
}

// ============================================================================
// Change forms
// ============================================================================

#[derive(Debug, Serialize)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct FieldSpec {
    name: &'static str,
    label: &'static str,
    kind: &'static str,
    value: String,
    checked: bool,
    max_length: Option<usize>,
    options: Vec<SelectOption>,
    help: Option<&'static str>,
    errors: Vec<String>,
}

impl FieldSpec {
    fn new(name: &'static str, label: &'static str, kind: &'static str, errors: &ValidationErrors) -> Self {
        Self {
            name,
            label,
            kind,
            value: String::new(),
            checked: false,
            max_length: None,
            options: Vec::new(),
            help: None,
            errors: errors.get(name).map(<[String]>::to_vec).unwrap_or_default(),
        }
    }

    fn text(name: &'static str, label: &'static str, value: &str, max: usize, errors: &ValidationErrors) -> Self {
        Self {
            value: value.to_string(),
            max_length: Some(max),
            ..Self::new(name, label, "text", errors)
        }
    }

    fn date(name: &'static str, label: &'static str, value: &str, errors: &ValidationErrors) -> Self {
        Self {
            value: value.to_string(),
            ..Self::new(name, label, "date", errors)
        }
    }

    fn checkbox(name: &'static str, label: &'static str, checked: bool, errors: &ValidationErrors) -> Self {
        Self {
            checked,
            ..Self::new(name, label, "checkbox", errors)
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineRow {
    index: usize,
    id: Option<String>,
    title: String,
    publish_date: String,
    available: bool,
    delete: bool,
    errors: BTreeMap<&'static str, Vec<String>>,
}

#[derive(Debug, Serialize)]
struct InlineSpec {
    prefix: &'static str,
    title: &'static str,
    rows: Vec<InlineRow>,
}

/// A change form for any of the three models, raw as posted
enum EditForm {
    Publisher(PublisherForm),
    Author(AuthorForm),
    Book(BookForm),
}

fn extra_inline_row() -> InlineBookForm {
    InlineBookForm {
        available: true,
        ..Default::default()
    }
}

impl EditForm {
    /// Empty form for the add screen
    fn blank(model: LibraryModel) -> Self {
        match model {
            LibraryModel::Publisher => EditForm::Publisher(PublisherForm {
                books: vec![extra_inline_row()],
                ..Default::default()
            }),
            LibraryModel::Author => EditForm::Author(AuthorForm::default()),
            LibraryModel::Book => EditForm::Book(BookForm {
                available: true,
                ..Default::default()
            }),
        }
    }

    /// Form filled from a stored object
    async fn load(model: LibraryModel, service: &LibraryService, id: i64) -> Result<Self, HtmlError> {
        Ok(match model {
            LibraryModel::Publisher => {
                let publisher = service.get_publisher(id).await?;
                let mut form = PublisherForm::from(&publisher);
                form.books = service
                    .publisher_books(id)
                    .await?
                    .iter()
                    .map(InlineBookForm::from)
                    .collect();
                form.books.push(extra_inline_row());
                EditForm::Publisher(form)
            }
            LibraryModel::Author => EditForm::Author(AuthorForm::from(&service.get_author(id).await?)),
            LibraryModel::Book => {
                let (book, author_ids) = service.get_book(id).await?;
                EditForm::Book(BookForm::from_book(&book, &author_ids))
            }
        })
    }

    fn parse(model: LibraryModel, form: &FormData) -> Self {
        match model {
            LibraryModel::Publisher => {
                let total = form
                    .get(&format!("{}-TOTAL_FORMS", crate::services::library::INLINE_PREFIX))
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0)
                    .min(MAX_INLINE_ROWS);
                let books = (0..total)
                    .map(|i| InlineBookForm {
                        id: form.get(&inline_field(i, "id")).map(str::to_string),
                        title: form.value(&inline_field(i, "title")),
                        publish_date: form.value(&inline_field(i, "publish_date")),
                        available: checkbox(form.get(&inline_field(i, "available"))),
                        delete: checkbox(form.get(&inline_field(i, "DELETE"))),
                    })
                    .collect();
                EditForm::Publisher(PublisherForm {
                    name: form.value("name"),
                    address: form.value("address"),
                    books,
                })
            }
            LibraryModel::Author => EditForm::Author(AuthorForm {
                first_name: form.value("first_name"),
                last_name: form.value("last_name"),
            }),
            LibraryModel::Book => EditForm::Book(BookForm {
                title: form.value("title"),
                publisher: form.value("publisher"),
                publish_date: form.value("publish_date"),
                available: checkbox(form.get("available")),
                authors: form.get_all("authors"),
            }),
        }
    }

    /// Create when `id` is `None`, otherwise update
    async fn save(&self, service: &LibraryService, id: Option<i64>) -> Result<(), LibraryServiceError> {
        match (self, id) {
            (EditForm::Publisher(f), None) => service.create_publisher(f).await.map(drop),
            (EditForm::Publisher(f), Some(id)) => service.update_publisher(id, f).await.map(drop),
            (EditForm::Author(f), None) => service.create_author(f).await.map(drop),
            (EditForm::Author(f), Some(id)) => service.update_author(id, f).await.map(drop),
            (EditForm::Book(f), None) => service.create_book(f).await.map(drop),
            (EditForm::Book(f), Some(id)) => service.update_book(id, f).await.map(drop),
        }
    }

    async fn fields(
        &self,
        service: &LibraryService,
        errors: &ValidationErrors,
    ) -> Result<(Vec<FieldSpec>, Option<InlineSpec>), HtmlError> {
        Ok(match self {
            EditForm::Publisher(f) => (
                vec![
                    FieldSpec::text("name", "Name", &f.name, 100, errors),
                    FieldSpec::text("address", "Address", &f.address, 200, errors),
                ],
                Some(inline_spec(&f.books, errors)),
            ),
            EditForm::Author(f) => (
                vec![
                    FieldSpec::text("first_name", "First name", &f.first_name, 50, errors),
                    FieldSpec::text("last_name", "Last name", &f.last_name, 50, errors),
                ],
                None,
            ),
            EditForm::Book(f) => {
                let authors = service.all_authors().await?;
                (book_fields(f, &authors, errors), None)
            }
        })
    }
}

fn book_fields(form: &BookForm, authors: &[Author], errors: &ValidationErrors) -> Vec<FieldSpec> {
    let mut publisher = FieldSpec::text("publisher", "Publisher", &form.publisher, 20, errors);
    publisher.help = Some("Publisher ID");

    let mut author_select = FieldSpec::new("authors", "Authors", "select_multiple", errors);
    author_select.options = authors
        .iter()
        .map(|a| {
            let value = a.id.to_string();
            SelectOption {
                selected: form.authors.contains(&value),
                label: a.to_string(),
                value,
            }
        })
        .collect();

    vec![
        FieldSpec::text("title", "Title", &form.title, 200, errors),
        publisher,
        FieldSpec::date("publish_date", "Publish date", &form.publish_date, errors),
        FieldSpec::checkbox("available", "Available", form.available, errors),
        author_select,
    ]
}

fn inline_spec(rows: &[InlineBookForm], errors: &ValidationErrors) -> InlineSpec {
    let rows = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mut row_errors = BTreeMap::new();
            for field in ["id", "title", "publish_date", "available"] {
                if let Some(messages) = errors.get(&inline_field(index, field)) {
                    row_errors.insert(field, messages.to_vec());
                }
            }
            InlineRow {
                index,
                id: row.id.clone().filter(|id| !id.is_empty()),
                title: row.title.clone(),
                publish_date: row.publish_date.clone(),
                available: row.available,
                delete: row.delete,
                errors: row_errors,
            }
        })
        .collect();

    InlineSpec {
        prefix: crate::services::library::INLINE_PREFIX,
        title: "Books",
        rows,
    }
}

async fn render_change_form(
    state: &AppState,
    user: &User,
    model: LibraryModel,
    form: &EditForm,
    errors: &ValidationErrors,
    object_id: Option<i64>,
) -> Result<Html<String>, HtmlError> {
    let (fields, inline) = form.fields(&state.library_service, errors).await?;

    let (title, action) = match object_id {
        None => (
            format!("Add {}", model.verbose_name()),
            format!("/admin/{}/add/", model.slug()),
        ),
        Some(id) => (
            format!("Change {}", model.verbose_name()),
            format!("/admin/{}/{}/change/", model.slug(), id),
        ),
    };

    let mut context = admin_context(user, &title);
    context.insert("model", &ModelMeta::from(model));
    context.insert("title", &title);
    context.insert("action", &action);
    context.insert("has_errors", &!errors.is_empty());
    context.insert("fields", &fields);
    if let Some(inline) = &inline {
        context.insert("inline", inline);
    }
    if let Some(id) = object_id {
        context.insert("object_id", &id);
    }
    render(state, "admin/change_form.html", &context)
}

/// Save and redirect, or re-render with the field errors
async fn submit(
    state: &AppState,
    user: &User,
    model: LibraryModel,
    form: FormData,
    object_id: Option<i64>,
) -> Result<Response, HtmlError> {
    let edit = EditForm::parse(model, &form);
    match edit.save(&state.library_service, object_id).await {
        Ok(()) => Ok(Redirect::to(&changelist_url(model)).into_response()),
        Err(LibraryServiceError::Validation(errors)) => {
            Ok(render_change_form(state, user, model, &edit, &errors, object_id)
                .await?
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /admin/{model}/add/
async fn add_page(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
) -> Result<Html<String>, HtmlError> {
    let model = resolve_model(&slug)?;
    let form = EditForm::blank(model);
    render_change_form(&state, &user, model, &form, &ValidationErrors::new(), None).await
}

/// POST /admin/{model}/add/
async fn add(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(slug): Path<String>,
    form: FormData,
) -> Result<Response, HtmlError> {
    let model = resolve_model(&slug)?;
    submit(&state, &user, model, form, None).await
}

/// GET /admin/{model}/{id}/change/
async fn change_page(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Html<String>, HtmlError> {
    let model = resolve_model(&slug)?;
    let id = parse_id(&id)?;
    let form = EditForm::load(model, &state.library_service, id).await?;
    render_change_form(&state, &user, model, &form, &ValidationErrors::new(), Some(id)).await
}

/// POST /admin/{model}/{id}/change/
async fn change(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, String)>,
    form: FormData,
) -> Result<Response, HtmlError> {
    let model = resolve_model(&slug)?;
    let id = parse_id(&id)?;
    submit(&state, &user, model, form, Some(id)).await
}

// ============================================================================
// Delete
// ============================================================================

/// GET /admin/{model}/{id}/delete/
async fn delete_page(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Html<String>, HtmlError> {
    let model = resolve_model(&slug)?;
    let id = parse_id(&id)?;
    let service = &state.library_service;

    let (object, related): (String, Vec<String>) = match model {
        LibraryModel::Publisher => {
            let publisher = service.get_publisher(id).await?;
            let books = service.publisher_books(id).await?;
            (
                publisher.to_string(),
                books.into_iter().map(|b| b.title).collect(),
            )
        }
        LibraryModel::Author => (service.get_author(id).await?.to_string(), Vec::new()),
        LibraryModel::Book => (service.get_book(id).await?.0.to_string(), Vec::new()),
    };

    let mut context = admin_context(&user, "Are you sure?");
    context.insert("model", &ModelMeta::from(model));
    context.insert("object", &object);
    context.insert("object_id", &id);
    context.insert("related", &related);
    render(&state, "admin/delete_confirmation.html", &context)
}

/// POST /admin/{model}/{id}/delete/
async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Response, HtmlError> {
    let model = resolve_model(&slug)?;
    let id = parse_id(&id)?;
    let service = &state.library_service;

    match model {
        LibraryModel::Publisher => service.delete_publisher(id).await?,
        LibraryModel::Author => service.delete_author(id).await?,
        LibraryModel::Book => service.delete_book(id).await?,
    }
    tracing::info!(
        user_id = user.id,
        model = model.slug(),
        id,
        "{} deleted",
        capitalize(model.verbose_name())
    );
    Ok(Redirect::to(&changelist_url(model)).into_response())
}
