//! Inline templates for the bookshelf pages.
//!
//! Registered in order: `base.html` first, since the pages extend it.

use django_async::core::DjangoResult;
use django_async::template::Engine;

const TEMPLATES: &[(&str, &str)] = &[
    (
        "base.html",
        r#"<!DOCTYPE html>
<html>
<head><title>{% block title %}Bookshelf{% endblock title %}</title></head>
<body>
<nav><a href="/books/">Books</a> | <a href="/authors/">Authors</a> | <a href="/archive/">Archive</a> | <a href="/about/">About</a></nav>
<main>{% block content %}{% endblock content %}</main>
</body>
</html>"#,
    ),
    (
        "bookshelf/_pagination.html",
        r#"{% if is_paginated %}<p class="pages">
{% if page_obj.has_previous %}<a href="?page={{ page_obj.previous_page_number }}">previous</a>{% endif %}
Page {{ page_obj.number }} of {{ paginator.num_pages }}
{% if page_obj.has_next %}<a href="?page={{ page_obj.next_page_number }}">next</a>{% endif %}
</p>{% endif %}"#,
    ),
    (
        "bookshelf/book_list.html",
        r#"{% extends "base.html" %}
{% block title %}Books{% endblock title %}
{% block content %}<h1>Books</h1>
{% if book_list | length == 0 %}<p>No books yet.</p>{% endif %}
<ul>{% for book in book_list %}
<li><a href="/books/{{ book.id }}/">{{ book.title }}</a> ({{ book.pubdate }})</li>
{% endfor %}</ul>
{% include "bookshelf/_pagination.html" %}
<p><a href="/books/new/">Add a book</a></p>{% endblock content %}"#,
    ),
    (
        "bookshelf/book_detail.html",
        r#"{% extends "base.html" %}
{% block title %}{{ book.title }}{% endblock title %}
{% block content %}<h1>{{ book.title }}</h1>
<p>{{ book.pages }} pages, published {{ book.pubdate }}.</p>
{% if book.summary %}<p>{{ book.summary }}</p>{% endif %}
<p><a href="/books/{{ book.id }}/edit/">Edit</a> | <a href="/books/{{ book.id }}/delete/">Delete</a></p>{% endblock content %}"#,
    ),
    (
        "bookshelf/book_form.html",
        r#"{% extends "base.html" %}
{% block content %}<h1>{% if object %}Edit {{ object.title }}{% else %}New book{% endif %}</h1>
<form method="post">
{% for error in form.non_field_errors %}<p class="error">{{ error }}</p>{% endfor %}
{% for field in form.fields %}<p>
<label for="id_{{ field.html_name }}">{{ field.label }}</label>
<input type="{{ field.input_type }}" id="id_{{ field.html_name }}" name="{{ field.html_name }}" value="{{ field.value }}">
{% for error in field.errors %}<span class="error">{{ error }}</span>{% endfor %}
</p>{% endfor %}
<button type="submit">Save</button>
</form>{% endblock content %}"#,
    ),
    (
        "bookshelf/book_confirm_delete.html",
        r#"{% extends "base.html" %}
{% block content %}<form method="post">
<p>Delete "{{ object.title }}"?</p>
<button type="submit">Confirm</button>
</form>{% endblock content %}"#,
    ),
    (
        "bookshelf/book_archive.html",
        r#"{% extends "base.html" %}
{% block title %}Archive{% endblock title %}
{% block content %}<h1>Archive</h1>
<ul>{% for year in date_list %}<li><a href="/archive/{{ year | truncate(length=4, end="") }}/">{{ year | truncate(length=4, end="") }}</a></li>{% endfor %}</ul>
<h2>Latest</h2>
<ul>{% for book in latest %}<li>{{ book.title }}</li>{% endfor %}</ul>{% endblock content %}"#,
    ),
    (
        "bookshelf/book_archive_year.html",
        r#"{% extends "base.html" %}
{% block content %}<h1>Books of {{ year | truncate(length=4, end="") }}</h1>
<ul>{% for month in date_list %}<li>{{ month | truncate(length=7, end="") }}</li>{% endfor %}</ul>
<ul>{% for book in book_list %}<li>{{ book.title }}</li>{% endfor %}</ul>
{% if previous_year %}<a href="/archive/{{ previous_year | truncate(length=4, end="") }}/">earlier</a>{% endif %}
{% if next_year %}<a href="/archive/{{ next_year | truncate(length=4, end="") }}/">later</a>{% endif %}{% endblock content %}"#,
    ),
    (
        "bookshelf/book_archive_month.html",
        r#"{% extends "base.html" %}
{% block content %}<h1>Books of {{ month | truncate(length=7, end="") }}</h1>
<ul>{% for book in book_list %}<li>{{ book.title }} ({{ book.pubdate }})</li>{% endfor %}</ul>{% endblock content %}"#,
    ),
    (
        "bookshelf/author_list.html",
        r#"{% extends "base.html" %}
{% block title %}Authors{% endblock title %}
{% block content %}<h1>Authors</h1>
<ul>{% for author in author_list %}<li><a href="/authors/{{ author.slug }}/">{{ author.name }}</a></li>{% endfor %}</ul>
{% include "bookshelf/_pagination.html" %}{% endblock content %}"#,
    ),
    (
        "bookshelf/author_detail.html",
        r#"{% extends "base.html" %}
{% block title %}{{ author.name }}{% endblock title %}
{% block content %}<h1>{{ author.name }}</h1>{% endblock content %}"#,
    ),
    (
        "bookshelf/about.html",
        r#"{% extends "base.html" %}
{% block content %}<h1>About</h1><p>{{ tagline }}</p>{% endblock content %}"#,
    ),
];

/// Registers every bookshelf template on `engine`.
pub fn install(engine: &Engine) -> DjangoResult<()> {
    for (name, source) in TEMPLATES {
        engine.add_string_template(name, source)?;
    }
    tracing::debug!(count = TEMPLATES.len(), "Installed bookshelf templates");
    Ok(())
}
