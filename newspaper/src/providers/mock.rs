use anyhow::Result;

use super::{FetchQuery, NewsProvider};
use crate::article::{Article, Category};

struct MockItem {
    title: &'static str,
    description: &'static str,
    source: &'static str,
    author: &'static str,
    category: Category,
    slug: &'static str,
}

const MOCK_ITEMS: &[MockItem] = &[
    MockItem {
        title: "Open-source AI models close the gap with commercial systems",
        description: "Independent benchmarks show community-trained language models matching paid offerings on reasoning tasks. Researchers credit better training data. Companies are rethinking licensing costs.",
        source: "Tech Ledger",
        author: "Priya Raman",
        category: Category::Technology,
        slug: "open-source-ai-models",
    },
    MockItem {
        title: "Chipmakers race to build 2nm fabs as demand for AI hardware surges",
        description: "Three of the largest foundries announced new fabrication plants. Lead times for accelerators remain above six months. Analysts expect prices to stay high through next year.",
        source: "Silicon Report",
        author: "Daniel Okafor",
        category: Category::Technology,
        slug: "chipmakers-2nm-fabs",
    },
    MockItem {
        title: "New battery chemistry promises electric cars that charge in ten minutes",
        description: "A sodium-based cell survived 3,000 fast-charge cycles in lab tests. Startups plan pilot production next year. Automakers are watching costs closely.",
        source: "Future Mobility",
        author: "Lena Fischer",
        category: Category::Technology,
        slug: "ten-minute-battery",
    },
    MockItem {
        title: "Browser makers agree on a common standard for passkeys",
        description: "The agreement lets users move passkeys between devices and vendors. Security teams say phishing losses could drop sharply. Rollout starts this autumn.",
        source: "Web Weekly",
        author: "Marcus Lee",
        category: Category::Technology,
        slug: "passkey-standard",
    },
    MockItem {
        title: "Satellite internet reaches remote schools across three continents",
        description: "A coalition of nonprofits connected 1,200 rural schools. Teachers report more students completing coursework. Funding for the next phase is still uncertain.",
        source: "Tech Ledger",
        author: "Amara Nwosu",
        category: Category::Technology,
        slug: "satellite-internet-schools",
    },
    MockItem {
        title: "Quantum computer keeps qubits stable for a full second",
        description: "Engineers reported a tenfold jump in coherence time on a superconducting chip. Error rates fell below the threshold for practical correction. Commercial machines are still years away.",
        source: "Silicon Report",
        author: "Yuki Tanaka",
        category: Category::Technology,
        slug: "quantum-coherence-record",
    },
    MockItem {
        title: "Smartphone makers promise seven years of software updates",
        description: "Two of the biggest brands extended support for their flagship lines. Repair advocates welcomed the pledge. Older models are not covered.",
        source: "Gadget Desk",
        author: "Sofia Alvarez",
        category: Category::Technology,
        slug: "seven-year-updates",
    },
    MockItem {
        title: "Cloud outage disrupts payments and streaming for six hours",
        description: "A configuration error in one region cascaded across dependent services. Banks reported delayed card transactions. The provider promised a full incident review.",
        source: "Web Weekly",
        author: "Tom Becker",
        category: Category::Technology,
        slug: "cloud-outage",
    },
    MockItem {
        title: "Robotics startup unveils warehouse robot that learns new tasks overnight",
        description: "The robot picks unfamiliar items after watching a few demonstrations. Pilot customers include two grocery chains. Unions are asking for retraining guarantees.",
        source: "Future Mobility",
        author: "Grace Kim",
        category: Category::Technology,
        slug: "warehouse-robot",
    },
    MockItem {
        title: "Regulators publish first rules for labeling AI-generated images",
        description: "Platforms must mark synthetic images and keep provenance metadata. Large services have a year to comply. Civil liberties groups want stronger enforcement.",
        source: "Tech Ledger",
        author: "Omar Haddad",
        category: Category::Technology,
        slug: "ai-image-labels",
    },
    MockItem {
        title: "Central banks signal a pause as inflation cools",
        description: "Policy makers in several economies held rates steady. Core inflation fell for the fourth consecutive month. Markets now price in cuts early next year.",
        source: "Market Watchtower",
        author: "Helen Brooks",
        category: Category::Business,
        slug: "central-banks-pause",
    },
    MockItem {
        title: "Small businesses turn to four-day weeks to keep staff",
        description: "A survey of 2,000 firms found retention improved after shorter weeks. Productivity held steady in most sectors. Retailers remain skeptical.",
        source: "Main Street Journal",
        author: "Carlos Mendes",
        category: Category::Business,
        slug: "four-day-week",
    },
    MockItem {
        title: "Global shipping costs fall as port congestion eases",
        description: "Container rates dropped to their lowest level in two years. Importers expect cheaper goods before the holidays. Some carriers are cancelling sailings.",
        source: "Trade Today",
        author: "Yuki Tanaka",
        category: Category::Business,
        slug: "shipping-costs-fall",
    },
    MockItem {
        title: "Telescope captures the most distant galaxy ever observed",
        description: "The galaxy formed about 300 million years after the Big Bang. Astronomers say it is surprisingly bright. Follow-up observations are planned.",
        source: "Cosmos Daily",
        author: "Ines Duarte",
        category: Category::Science,
        slug: "distant-galaxy",
    },
    MockItem {
        title: "Scientists map the complete brain wiring of a fruit fly",
        description: "The connectome includes more than 130,000 neurons. The map could help explain how brains process information. The data is freely available.",
        source: "Lab Notes",
        author: "Oliver Grant",
        category: Category::Science,
        slug: "fruit-fly-connectome",
    },
    MockItem {
        title: "Coral reefs show signs of recovery after protected-zone expansion",
        description: "Surveys found coral cover rising in newly protected waters. Fish populations also rebounded. Scientists warn warming seas remain a threat.",
        source: "Ocean Science Review",
        author: "Mele Fifita",
        category: Category::Science,
        slug: "coral-recovery",
    },
    MockItem {
        title: "Walking after meals lowers blood sugar, study finds",
        description: "Even ten minutes of light walking helped participants. The effect was strongest after dinner. Doctors call it an easy habit to adopt.",
        source: "Health Matters",
        author: "Dr. Sarah Kim",
        category: Category::Health,
        slug: "walking-after-meals",
    },
    MockItem {
        title: "New vaccine against RSV approved for older adults",
        description: "Regulators cleared the shot after trials showed strong protection. Pharmacies will stock it this season. Insurers are expected to cover it.",
        source: "Medical Times",
        author: "Rafael Ortiz",
        category: Category::Health,
        slug: "rsv-vaccine",
    },
    MockItem {
        title: "Sleep researchers link irregular bedtimes to heart risk",
        description: "Participants with variable sleep schedules had higher blood pressure. Consistency mattered more than duration. The study followed 2,000 adults.",
        source: "Health Matters",
        author: "Anika Patel",
        category: Category::Health,
        slug: "irregular-sleep-heart",
    },
    MockItem {
        title: "Underdog club wins the cup in dramatic penalty shootout",
        description: "The second-division side beat the champions after a goalless final. Their keeper saved three penalties. Fans celebrated late into the night.",
        source: "Sports Central",
        author: "Tom Hughes",
        category: Category::Sports,
        slug: "cup-penalty-shootout",
    },
    MockItem {
        title: "Marathon record falls on a cool morning in Berlin",
        description: "The winner shaved 30 seconds off the previous record. Pacers and ideal weather helped. The women's race also produced a course record.",
        source: "Run World",
        author: "Greta Lind",
        category: Category::Sports,
        slug: "berlin-marathon-record",
    },
    MockItem {
        title: "League announces expansion to two new cities",
        description: "The new teams will begin play in two seasons. Stadium deals are still being negotiated. Existing owners approved the plan unanimously.",
        source: "Sports Central",
        author: "Jamal Wright",
        category: Category::Sports,
        slug: "league-expansion",
    },
    MockItem {
        title: "Indie film sweeps the festival's top awards",
        description: "The low-budget drama won best picture and best director. Distributors are bidding for the rights. A wide release is expected next spring.",
        source: "Screen Scene",
        author: "Chloe Martin",
        category: Category::Entertainment,
        slug: "indie-film-awards",
    },
    MockItem {
        title: "Streaming services bundle up to slow subscriber losses",
        description: "Two major platforms will offer a joint discount. Analysts see consolidation ahead. Viewers have been cancelling after price hikes.",
        source: "Media Pulse",
        author: "Noah Bennett",
        category: Category::Entertainment,
        slug: "streaming-bundles",
    },
    MockItem {
        title: "Leaders reach agreement on cross-border water sharing",
        description: "The deal ends a decade-long dispute over river allocations. Farmers on both sides welcomed it. Monitoring will be handled by a joint commission.",
        source: "World Dispatch",
        author: "Fatima Zahra",
        category: Category::World,
        slug: "water-sharing-agreement",
    },
    MockItem {
        title: "Record number of countries pledge to cut methane emissions",
        description: "More than 150 nations joined the pledge at the climate summit. Oil and gas producers face new reporting rules. Campaigners want binding targets.",
        source: "Global Report",
        author: "Erik Johansson",
        category: Category::World,
        slug: "methane-pledge",
    },
    MockItem {
        title: "Volcanic eruption disrupts flights across the region",
        description: "An ash cloud forced airlines to cancel hundreds of flights. Authorities evacuated nearby villages. Scientists expect activity to continue for days.",
        source: "World Dispatch",
        author: "Ana Costa",
        category: Category::World,
        slug: "volcano-flights",
    },
    MockItem {
        title: "Lawmakers pass bipartisan bill on data privacy",
        description: "The bill gives users the right to delete personal data. Tech companies will have a year to comply. The measure now heads to the president.",
        source: "Capitol Brief",
        author: "Rebecca Stone",
        category: Category::Politics,
        slug: "data-privacy-bill",
    },
    MockItem {
        title: "City elections see highest turnout in 20 years",
        description: "Early voting and mail ballots drove participation. Several incumbents lost their seats. Housing was the top issue for voters.",
        source: "Civic Times",
        author: "Luis Herrera",
        category: Category::Politics,
        slug: "city-election-turnout",
    },
    MockItem {
        title: "Community garden network doubles in size",
        description: "Volunteers opened twelve new plots this year. Produce is shared with local food banks. Organizers are looking for more land.",
        source: "Neighborhood News",
        author: "Grace Liu",
        category: Category::Local,
        slug: "community-gardens",
    },
    MockItem {
        title: "Morning briefing: what to know today",
        description: "Markets open higher, a storm system moves east and a new museum opens downtown. Here is everything you need before your first coffee.",
        source: "Newspaper.AI",
        author: "Newspaper.AI Staff",
        category: Category::General,
        slug: "morning-briefing",
    },
];

/// Static articles used when every network source fails or under-delivers
#[derive(Debug, Clone, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    /// Every mock article. Dates are left empty so freshening places them inside the window.
    pub fn all(&self) -> Vec<Article> {
        MOCK_ITEMS
            .iter()
            .map(|item| {
                Article::new(
                    item.title,
                    format!("https://newspaper.ai/mock/{}", item.slug),
                    item.source,
                    item.category,
                )
                .with_description(item.description)
                .with_image(Some(format!("https://newspaper.ai/images/mock/{}.jpg", item.slug)))
                .with_author(Some(item.author.to_string()))
            })
            .collect()
    }

    /// Mock articles of one category; `None` means all of them.
    pub fn by_category(&self, category: Option<Category>) -> Vec<Article> {
        self.all()
            .into_iter()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .collect()
    }

    /// Mock articles whose title or description contains `query`.
    pub fn matching(&self, query: &str) -> Vec<Article> {
        self.all().into_iter().filter(|a| a.mentions(query)).collect()
    }
}

#[async_trait::async_trait]
impl NewsProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn top_headlines(&self, query: &FetchQuery) -> Result<Vec<Article>> {
        Ok(self.by_category(query.category))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Article>> {
        Ok(self.matching(query).into_iter().take(limit).collect())
    }
}
