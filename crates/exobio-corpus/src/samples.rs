//! Bundled sample publications.
//!
//! Four representative space-biology publications used to seed an empty
//! store for demos and tests.

use exobio_core::types::Publication;

/// The bundled sample publication set.
pub fn sample_publications() -> Vec<Publication> {
    vec![
        Publication {
            id: 1,
            title: "Effects of Microgravity on Plant Cell Walls and Growth Patterns".to_string(),
            authors: vec![
                "Dr. Sarah Johnson".to_string(),
                "Dr. Mike Chen".to_string(),
                "Dr. Lisa Rodriguez".to_string(),
            ],
            year: 2023,
            mission: "ISS Expedition 68".to_string(),
            organism: "Arabidopsis thaliana".to_string(),
            experiment_type: "Botanical Research".to_string(),
            abstract_text: "This study investigates how microgravity conditions aboard the \
                International Space Station affect plant cell wall composition and growth \
                patterns in Arabidopsis thaliana. Results show significant changes in \
                cellulose organization and altered gravitropic responses."
                .to_string(),
            keywords: vec![
                "microgravity".to_string(),
                "plant biology".to_string(),
                "cell walls".to_string(),
                "ISS".to_string(),
                "space agriculture".to_string(),
            ],
            connections: vec![
                "cell-wall-proteins".to_string(),
                "gravitropism".to_string(),
                "space-farming".to_string(),
            ],
        },
        Publication {
            id: 2,
            title: "Bone Density Changes in Astronauts During Long-Duration Spaceflight"
                .to_string(),
            authors: vec![
                "Dr. Robert Kim".to_string(),
                "Dr. Emma Thompson".to_string(),
                "Dr. James Wilson".to_string(),
            ],
            year: 2022,
            mission: "Artemis Analog".to_string(),
            organism: "Homo sapiens".to_string(),
            experiment_type: "Human Physiology".to_string(),
            abstract_text: "Comprehensive analysis of bone mineral density changes in \
                astronauts during 6-month missions, with implications for Mars exploration \
                preparedness."
                .to_string(),
            keywords: vec![
                "bone density".to_string(),
                "astronauts".to_string(),
                "long-duration flight".to_string(),
                "osteoporosis".to_string(),
                "countermeasures".to_string(),
            ],
            connections: vec![
                "calcium-metabolism".to_string(),
                "exercise-protocols".to_string(),
                "mars-mission-prep".to_string(),
            ],
        },
        Publication {
            id: 3,
            title: "Microbial Community Dynamics in Closed-Loop Life Support Systems".to_string(),
            authors: vec![
                "Dr. Ana Martinez".to_string(),
                "Dr. Kevin Park".to_string(),
                "Dr. Rachel Green".to_string(),
            ],
            year: 2023,
            mission: "ECLSS Testing".to_string(),
            organism: "Mixed microbial communities".to_string(),
            experiment_type: "Astrobiology".to_string(),
            abstract_text: "Investigation of microbial ecosystem stability and succession \
                patterns in spacecraft environmental control systems over extended periods."
                .to_string(),
            keywords: vec![
                "microbiome".to_string(),
                "life support".to_string(),
                "biofilms".to_string(),
                "spacecraft hygiene".to_string(),
                "closed ecosystems".to_string(),
            ],
            connections: vec![
                "water-recycling".to_string(),
                "air-purification".to_string(),
                "crew-health".to_string(),
            ],
        },
        Publication {
            id: 4,
            title: "Radiation Effects on DNA Repair Mechanisms in Human Cells".to_string(),
            authors: vec![
                "Dr. Maria Santos".to_string(),
                "Dr. David Lee".to_string(),
                "Dr. Jennifer Adams".to_string(),
            ],
            year: 2021,
            mission: "ISS National Lab".to_string(),
            organism: "Human cell cultures".to_string(),
            experiment_type: "Radiation Biology".to_string(),
            abstract_text: "Analysis of DNA damage and repair pathway efficiency in human \
                cells exposed to space radiation environment."
                .to_string(),
            keywords: vec![
                "radiation".to_string(),
                "DNA repair".to_string(),
                "space environment".to_string(),
                "cellular response".to_string(),
                "cancer risk".to_string(),
            ],
            connections: vec![
                "radiation-shielding".to_string(),
                "pharmaceutical-countermeasures".to_string(),
                "crew-health-monitoring".to_string(),
            ],
        },
    ]
}
