use iced::{
    widget::{button, column, scrollable, text, text_input, Column, Space},
    Element, Length,
};

use crate::application::{controller::IDLE_LABEL, ProgressView};

/// Main view state
pub struct ScrapeView {
    pub sitemap_url: String,
    pub log: Vec<String>,
    pub follow_log: bool,
    pub trigger_enabled: bool,
    pub trigger_label: String,
    pub download_visible: bool,
    pub is_downloading: bool,
    pub download_status: Option<String>,
}

impl Default for ScrapeView {
    fn default() -> Self {
        Self {
            sitemap_url: String::new(),
            log: Vec::new(),
            follow_log: true,
            trigger_enabled: true,
            trigger_label: IDLE_LABEL.to_string(),
            download_visible: false,
            is_downloading: false,
            download_status: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScrapeMessage {
    SitemapUrlChanged(String),
    SubmitPressed,
    DownloadPressed,
}

impl ProgressView for ScrapeView {
    fn clear_log(&mut self) {
        self.log.clear();
        self.follow_log = false;
    }

    fn append_line(&mut self, line: &str) {
        self.log.push(line.to_string());
    }

    fn scroll_to_latest(&mut self) {
        self.follow_log = true;
    }

    fn set_download_visible(&mut self, visible: bool) {
        self.download_visible = visible;
        if !visible {
            self.download_status = None;
        }
    }

    fn set_trigger(&mut self, enabled: bool, label: &str) {
        self.trigger_enabled = enabled;
        self.trigger_label = label.to_string();
    }
}

impl ScrapeView {
    pub fn update(&mut self, message: ScrapeMessage) {
        match message {
            ScrapeMessage::SitemapUrlChanged(url) => {
                self.sitemap_url = url;
            }
            ScrapeMessage::SubmitPressed | ScrapeMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, ScrapeMessage> {
        let lines: Column<'_, ScrapeMessage> = Column::with_children(
            self.log
                .iter()
                .map(|line| text(line.as_str()).size(14).into()),
        )
        .spacing(4);

        let mut log = scrollable(lines).height(Length::Fill).width(Length::Fill);
        if self.follow_log {
            log = log.anchor_bottom();
        }

        let mut content = column![
            text("Sitemap Phone Scraper").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Sitemap URL:").size(16),
            text_input("https://example.com/sitemap.xml", &self.sitemap_url)
                .on_input(ScrapeMessage::SitemapUrlChanged)
                .on_submit(ScrapeMessage::SubmitPressed)
                .padding(10),
            button(text(self.trigger_label.as_str()))
                .on_press_maybe(self.trigger_enabled.then_some(ScrapeMessage::SubmitPressed))
                .padding([10, 20]),
            Space::new().height(Length::Fixed(10.0)),
            log,
        ]
        .padding(20)
        .spacing(10);

        if self.download_visible {
            content = content.push(
                button("Download Results")
                    .on_press_maybe((!self.is_downloading).then_some(ScrapeMessage::DownloadPressed))
                    .padding([10, 20]),
            );
        }
        if let Some(status) = &self.download_status {
            content = content.push(text(status.as_str()).size(14));
        }

        content.into()
    }
}
