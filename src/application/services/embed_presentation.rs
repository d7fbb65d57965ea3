//! Chooses what a message shows below its text.

use serde::Serialize;

use crate::domain::entities::{
    Classification, EmbedDescriptor, ImageDimensions, MessageAttachment, OpenGraphData,
};

/// Image region of a link preview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardImage {
    /// Remote image uri.
    pub uri: String,
    /// Local locator once cached.
    pub local_uri: Option<String>,
    /// Render dimensions.
    pub dimensions: Option<ImageDimensions>,
}

/// Link preview card built from OpenGraph metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenGraphCard {
    /// Site name line.
    pub site_name: Option<String>,
    /// Title, or the link itself when the page has none.
    pub title: String,
    /// Description text.
    pub description: Option<String>,
    /// Link the card opens.
    pub url: String,
    /// Preview image.
    pub image: Option<CardImage>,
}

/// What to render for a message's embed area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum EmbedPresentation {
    /// Nothing.
    None,
    /// Image or video thumbnail the user can collapse.
    Media(EmbedDescriptor),
    /// Message attachments.
    Attachments(Vec<MessageAttachment>),
    /// Link preview card.
    OpenGraphCard(OpenGraphCard),
}

impl EmbedPresentation {
    /// Decides the presentation for a resolved embed.
    ///
    /// Media embeds win unless they failed to load or the image link carries
    /// a described preview. Otherwise attachments come first, then the
    /// preview card when link previews are enabled.
    #[must_use]
    pub fn decide(
        descriptor: &EmbedDescriptor,
        open_graph: Option<&OpenGraphData>,
        attachments: &[MessageAttachment],
        show_link_previews: bool,
    ) -> Self {
        if descriptor.link.is_none() && attachments.is_empty() {
            return Self::None;
        }

        let described = open_graph.is_some_and(OpenGraphData::has_description);
        let media = match descriptor.kind {
            Classification::Image => !described,
            Classification::YouTube { .. } => true,
            Classification::Generic | Classification::None => false,
        };
        if media && !descriptor.load_error {
            return Self::Media(descriptor.clone());
        }

        if !attachments.is_empty() {
            return Self::Attachments(attachments.to_vec());
        }

        match open_graph {
            Some(data) if show_link_previews && described => {
                Self::OpenGraphCard(build_card(descriptor, data))
            }
            _ => Self::None,
        }
    }

    /// Returns true if nothing is rendered.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

fn build_card(descriptor: &EmbedDescriptor, data: &OpenGraphData) -> OpenGraphCard {
    let url = data
        .url
        .clone()
        .filter(|url| !url.is_empty())
        .or_else(|| descriptor.effective_link().map(str::to_owned))
        .unwrap_or_default();

    let title = data
        .title
        .clone()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| url.clone());

    let image = match (&descriptor.kind, &descriptor.remote_uri) {
        (Classification::Generic, Some(uri)) if !descriptor.load_error => Some(CardImage {
            uri: uri.clone(),
            local_uri: descriptor.media_uri.clone(),
            dimensions: descriptor.dimensions,
        }),
        _ => None,
    };

    OpenGraphCard {
        site_name: data.site_name.clone(),
        title,
        description: data.description.clone(),
        url,
        image,
    }
}
