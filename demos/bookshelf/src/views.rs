//! The bookshelf routes.
//!
//! Every page is a generic view; the editing pages sit behind access
//! wrappers. A request names its user in the `x-demo-user` header:
//!
//! - `admin` - a superuser
//! - `editor` - may change and delete books
//! - anything else - an ordinary signed-in reader

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use django_async::auth::{
    with_user_source, AbstractUser, LoginRequired, PermissionRequired, RequestUser, UserSource,
};
use django_async::core::DjangoResult;
use django_async::db::{InMemoryBackend, Manager};
use django_async::http::HttpRequest;
use django_async::template::Engine;
use django_async::views::{
    CreateView, DateArchiveView, DateDetailView, DeleteView, DetailView, ListView, RedirectView,
    TemplateView, UpdateView, View, ViewApp, ViewFunction,
};

use crate::models::{Author, Book};

pub const USER_HEADER: &str = "x-demo-user";

/// The in-memory tables behind the site.
#[derive(Debug, Clone)]
pub struct Library {
    pub authors: Manager<Author>,
    pub books: Manager<Book>,
}

impl Library {
    pub fn new() -> Self {
        Self {
            authors: Manager::new(Arc::new(InMemoryBackend::<Author>::new())),
            books: Manager::new(Arc::new(InMemoryBackend::<Book>::new())),
        }
    }

    /// Fills the tables with a few classics.
    pub async fn seed(&self) -> DjangoResult<()> {
        let le_guin = self.authors.create(Author::new("Ursula K. Le Guin")).await?;
        let herbert = self.authors.create(Author::new("Frank Herbert")).await?;
        let le_guin = le_guin.id.unwrap_or_default();
        let herbert = herbert.id.unwrap_or_default();

        let books = [
            ("A Wizard of Earthsea", 183, (1968, 11, 1), le_guin),
            ("The Left Hand of Darkness", 286, (1969, 3, 1), le_guin),
            ("The Dispossessed", 341, (1974, 5, 1), le_guin),
            ("Dune", 412, (1965, 8, 1), herbert),
            ("Dune Messiah", 256, (1969, 10, 15), herbert),
        ];
        for (title, pages, (y, m, d), author) in books {
            let Some(pubdate) = NaiveDate::from_ymd_opt(y, m, d) else {
                continue;
            };
            self.books.create(Book::new(title, pages, pubdate).by(author)).await?;
        }
        tracing::info!("Seeded the bookshelf");
        Ok(())
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

/// The user named by the `x-demo-user` header.
#[derive(Debug, Clone)]
pub struct DemoUser {
    username: String,
}

#[async_trait]
impl UserSource for DemoUser {
    async fn load_user(&self) -> DjangoResult<RequestUser> {
        let mut user = AbstractUser::new(self.username.as_str());
        match self.username.as_str() {
            "admin" => {
                user.is_staff = true;
                user.is_superuser = true;
            }
            "editor" => {
                user = user
                    .with_perm("bookshelf.change_book")
                    .with_perm("bookshelf.delete_book");
            }
            _ => {}
        }
        Ok(user.into())
    }
}

fn demo_user(request: &HttpRequest) -> Option<Arc<dyn UserSource>> {
    let username = request.headers().get(USER_HEADER)?.to_str().ok()?;
    if username.is_empty() {
        return None;
    }
    Some(Arc::new(DemoUser {
        username: username.to_string(),
    }))
}

fn serve(view: impl View) -> ViewFunction {
    with_user_source(view.as_view(), demo_user)
}

/// Builds the site over `library`, rendering with `engine`.
pub fn build_app(library: &Library, engine: &Arc<Engine>) -> ViewApp {
    let books = &library.books;
    let authors = &library.authors;
    let book_fields = ["title", "pages", "pubdate", "author_id", "summary"];

    ViewApp::new()
        .route("/", serve(RedirectView::new("/books/")))
        .route(
            "/books/",
            serve(
                ListView::new("BookList")
                    .queryset(books.all())
                    .paginate_by(10)
                    .engine(engine.clone()),
            ),
        )
        .route(
            "/books/new/",
            serve(LoginRequired::new(
                CreateView::new("BookCreate")
                    .queryset(books.all())
                    .fields(&book_fields)
                    .success_url("/books/{id}/")
                    .engine(engine.clone()),
            )),
        )
        .route(
            "/books/{pk}/",
            serve(DetailView::new("BookDetail").queryset(books.all()).engine(engine.clone())),
        )
        .route(
            "/books/{pk}/edit/",
            serve(PermissionRequired::new(
                UpdateView::new("BookUpdate")
                    .queryset(books.all())
                    .fields(&book_fields)
                    .engine(engine.clone()),
                &["bookshelf.change_book"],
            )),
        )
        .route(
            "/books/{pk}/delete/",
            serve(PermissionRequired::new(
                DeleteView::new("BookDelete")
                    .queryset(books.all())
                    .success_url("/books/")
                    .engine(engine.clone()),
                &["bookshelf.delete_book"],
            )),
        )
        .route(
            "/archive/",
            serve(
                DateArchiveView::archive_index("BookArchive", "pubdate")
                    .queryset(books.all())
                    .engine(engine.clone()),
            ),
        )
        .route(
            "/archive/{year}/",
            serve(
                DateArchiveView::year("BookYearArchive", "pubdate")
                    .queryset(books.all())
                    .make_object_list(true)
                    .engine(engine.clone()),
            ),
        )
        .route(
            "/archive/{year}/{month}/",
            serve(
                DateArchiveView::month("BookMonthArchive", "pubdate")
                    .queryset(books.all())
                    .engine(engine.clone()),
            ),
        )
        .route(
            "/archive/{year}/{month}/{day}/{pk}/",
            serve(
                DateDetailView::new("BookDateDetail", "pubdate")
                    .queryset(books.all())
                    .engine(engine.clone()),
            ),
        )
        .route(
            "/authors/",
            serve(
                ListView::new("AuthorList")
                    .queryset(authors.all())
                    .paginate_by(20)
                    .engine(engine.clone()),
            ),
        )
        .route(
            "/authors/{slug}/",
            serve(DetailView::new("AuthorDetail").queryset(authors.all()).engine(engine.clone())),
        )
        .route(
            "/about/",
            serve(
                TemplateView::new("bookshelf/about.html")
                    .with_engine(engine.clone())
                    .with_context("tagline", "A small catalogue of books.".into()),
            ),
        )
}
