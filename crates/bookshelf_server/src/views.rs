//! HTML pages rendered with maud.
//!
//! Every interpolated value is escaped by maud; only the stylesheet is emitted raw.

use crate::covers::{ACCEPTED_EXTENSIONS, STATIC_URL};
use bookshelf_core::{Book, BookDraft, BookId, BookSort, Genre};
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "
body { font-family: Georgia, serif; margin: 0 auto; max-width: 960px; padding: 0 1rem; color: #2b2118; }
nav { display: flex; gap: 1rem; padding: 1rem 0; border-bottom: 1px solid #d8cbb8; }
nav a, .sorts a { color: #7a4b2a; }
.sorts a.active { font-weight: bold; }
.error { background: #fbe3e0; border: 1px solid #d9776b; padding: 0.5rem 0.75rem; }
form.book label { display: block; margin-top: 0.75rem; }
form.book input, form.book select, form.book textarea { width: 100%; max-width: 32rem; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
th, td { text-align: left; padding: 0.4rem; border-bottom: 1px solid #eee3d3; }
td.actions form { display: inline; }
img.cover { width: 60px; height: auto; display: block; }
img.collage { max-width: 100%; margin-top: 1rem; }
";

/// Where the shared book form posts to.
#[derive(Debug, Clone, Copy)]
pub enum FormMode {
    Add,
    Edit(BookId),
}

impl FormMode {
    fn action(self) -> String {
        match self {
            Self::Add => "/add".to_string(),
            Self::Edit(id) => format!("/book/{id}/edit"),
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::Add => "Add a book",
            Self::Edit(_) => "Edit book",
        }
    }

    fn submit_label(self) -> &'static str {
        match self {
            Self::Add => "Add to collection",
            Self::Edit(_) => "Save changes",
        }
    }
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · Bookshelf" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                nav {
                    a href="/home" { "Home" }
                    a href="/add" { "Add a book" }
                    a href="/collection" { "Collection" }
                }
                main { (body) }
            }
        }
    }
}

pub fn intro() -> Markup {
    layout(
        "Welcome",
        html! {
            h1 { "Bookshelf" }
            p { "A small place to keep track of every book you own." }
            p { a href="/home" { "Enter the library" } }
        },
    )
}

pub fn home(total: u64, has_collage: bool) -> Markup {
    let noun = if total == 1 { "book" } else { "books" };
    layout(
        "Home",
        html! {
            h1 { "Your library" }
            p.total { "You have " strong { (total) } " " (noun) " in your collection." }
            ul {
                li { a href="/add" { "Add a new book" } }
                li { a href="/collection" { "Browse the collection" } }
            }
            @if has_collage {
                img.collage src={ (STATIC_URL) "/collage.jpg" } alt="Covers from your collection";
            }
        },
    )
}

/// Add/edit form. `draft` carries the values to show, so a rejected
/// submission comes back with what the user typed.
pub fn book_form(mode: FormMode, draft: &BookDraft, error: Option<&str>) -> Markup {
    let selected_genre = Genre::parse(&draft.genre).unwrap_or_default();
    layout(
        mode.heading(),
        html! {
            h1 { (mode.heading()) }
            @if let Some(message) = error {
                p.error role="alert" { (message) }
            }
            form.book method="post" action=(mode.action()) enctype="multipart/form-data" {
                label for="title" { "Title" }
                input #title type="text" name="title" value=(draft.title) required;
                label for="author" { "Author" }
                input #author type="text" name="author" value=(draft.author) required;
                label for="edition" { "Edition" }
                input #edition type="text" name="edition" value=(draft.edition);
                label for="genre" { "Genre" }
                select #genre name="genre" {
                    @for genre in Genre::ALL {
                        option value=(genre.key()) selected[genre == selected_genre] {
                            (genre.label())
                        }
                    }
                }
                label for="hover_note" { "Hover note" }
                textarea #hover_note name="hover_note" rows="3" { (draft.hover_note) }
                label for="cover" { "Cover image" }
                @if let Some(cover) = draft.cover_filename.as_deref() {
                    img.cover src=(cover_url(cover)) alt="Current cover";
                    small { "Leave empty to keep the current cover." }
                }
                input #cover type="file" name="cover" accept=(cover_accept());
                p { button type="submit" { (mode.submit_label()) } }
            }
        },
    )
}

pub fn collection(books: &[Book], sort: BookSort) -> Markup {
    layout(
        "Collection",
        html! {
            h1 { "Collection" }
            p.sorts {
                "Sort by: "
                @for choice in BookSort::COLLECTION {
                    a href={ "/collection?sort=" (choice.key()) }
                        class=[(choice == sort).then_some("active")] {
                        (sort_label(choice))
                    }
                    " "
                }
            }
            @if books.is_empty() {
                p.empty { "No books yet. " a href="/add" { "Add your first one." } }
            } @else {
                table {
                    thead {
                        tr { th { "Cover" } th { "Title" } th { "Author" } th { "Edition" } th { "Genre" } th {} }
                    }
                    tbody {
                        @for book in books {
                            tr title=[book.hover_note.as_deref()] {
                                td {
                                    @if let Some(cover) = book.cover_filename.as_deref() {
                                        img.cover src=(cover_url(cover)) alt={ "Cover of " (book.title) } loading="lazy";
                                    }
                                }
                                td.title { (book.title) }
                                td.author { (book.author) }
                                td { (book.edition.as_deref().unwrap_or("")) }
                                td { (book.genre.label()) }
                                td.actions {
                                    a href={ "/book/" (book.id) "/edit" } { "Edit" }
                                    " "
                                    form method="post" action={ "/book/" (book.id) "/delete" } {
                                        button type="submit" { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn not_found() -> Markup {
    layout(
        "Not found",
        html! {
            h1 { "Not found" }
            p { "That page or book does not exist. " a href="/collection" { "Back to the collection." } }
        },
    )
}

pub fn server_error() -> Markup {
    layout(
        "Something went wrong",
        html! {
            h1 { "Something went wrong" }
            p { "The library could not complete that request. Please try again." }
        },
    )
}

fn cover_url(filename: &str) -> String {
    format!("{STATIC_URL}/covers/{filename}")
}

fn cover_accept() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|extension| format!(".{extension}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn sort_label(sort: BookSort) -> &'static str {
    match sort {
        BookSort::Newest | BookSort::Inserted => "Date added",
        BookSort::Title => "Title",
        BookSort::Genre => "Genre",
        BookSort::Author => "Author",
    }
}
