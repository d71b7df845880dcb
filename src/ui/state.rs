use crate::storage::Post;

/// Posts shown by the viewer and the cursor over them.
pub struct PostList {
    pub posts: Vec<Post>,
    pub selected: usize,
    /// One-line message replacing the key hints until the next key press
    pub status: Option<String>,
    /// Only redraw after something changed
    pub needs_redraw: bool,
}

impl PostList {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            selected: 0,
            status: None,
            needs_redraw: true,
        }
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.posts.get(self.selected)
    }

    pub fn next(&mut self) {
        if self.selected + 1 < self.posts.len() {
            self.selected += 1;
        }
    }

    pub fn previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn first(&mut self) {
        self.selected = 0;
    }

    pub fn last(&mut self) {
        self.selected = self.posts.len().saturating_sub(1);
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }
}

#[cfg(test)]
pub(crate) fn sample_posts(n: usize) -> Vec<Post> {
    (0..n)
        .map(|i| Post {
            id: uuid::Uuid::new_v4(),
            created_at: i as i64,
            updated_at: i as i64,
            title: format!("Post {i}"),
            url: format!("https://example.com/{i}"),
            description: None,
            published_at: None,
            feed_id: uuid::Uuid::nil(),
        })
        .collect()
}
