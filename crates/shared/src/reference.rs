//! Static sector and trail data for the Mont Orford ski area.

use crate::domain::Sector;

const MONT_ORFORD: &[&str] = &[
    "4 km",
    "Alpage",
    "Arpège",
    "Courant",
    "Coyote",
    "Crocus",
    "Des Caps",
    "Fleur de Lys",
    "Grande Coulée",
    "La Mésange",
    "La Perdrix",
    "Le Chevreuil",
    "Le Lièvre",
    "Le Lynx",
    "Le Wapiti",
    "Liaison",
    "Loustic",
    "Macareux",
    "Mocassin",
    "Normand",
    "Orfordienne",
    "Quatre Vents",
    "Slalom",
    "Sommet",
    "Sous-Bois des Caps",
    "Tempo",
    "Toutou",
    "Tunnel",
];

const GIROUX_NORD: &[&str] = &[
    "Boréale",
    "Escapade",
    "Grande Allée",
    "Les Bosquets",
    "Panoramique",
    "Pic-Bois",
    "Plein Vent",
    "Prélude",
    "Promenade",
    "Sous-Bois Giroux",
];

const GIROUX_EST: &[&str] = &[
    "De Là-Haut",
    "Détour",
    "La Longue",
    "Le Raccourci",
    "Les Aventuriers",
    "Nord-Est",
    "Panorama",
    "Retour Est",
    "Sol-Bois",
    "Sur La Crête",
];

const ALFRED_DESROCHERS: &[&str] = &[
    "Alfred",
    "Chemin de la Montagne",
    "Contour",
    "Des Écoliers",
    "Grand Duc",
    "Jonction Alfred",
    "La Familiale",
    "La Seigneuriale",
    "L'Écureuil",
    "L'Orignal",
    "Les Découvreurs",
    "Les Pionniers",
    "Petite Sœur",
    "Trappeur",
];

const REMONTEES: &[&str] = &[
    "Télésiège du Sommet",
    "Télésiège Giroux",
    "Télésiège Alfred",
    "Télésiège École",
    "Téléski T-Bar",
    "Tapis Roulant 1",
    "Tapis Roulant 2",
];

const RANDONNEE_ALPINE: &[&str] = &[
    "Sentier du Mont-Orford",
    "Sentier du Lac Stukely",
    "Sentier des Crêtes",
    "Sentier du Vieux-Moulin",
    "Boucle du Lac Fraser",
];

impl Sector {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::MontOrford => "Mont-Orford",
            Self::GirouxNord => "Mont Giroux Nord",
            Self::GirouxEst => "Mont Giroux Est",
            Self::AlfredDesrochers => "Mont Alfred-DesRochers",
            Self::Remontees => "Remontées mécaniques",
            Self::RandonneeAlpine => "Randonnée alpine",
        }
    }

    /// Trail names in display order.
    pub fn trails(self) -> &'static [&'static str] {
        match self {
            Self::MontOrford => MONT_ORFORD,
            Self::GirouxNord => GIROUX_NORD,
            Self::GirouxEst => GIROUX_EST,
            Self::AlfredDesrochers => ALFRED_DESROCHERS,
            Self::Remontees => REMONTEES,
            Self::RandonneeAlpine => RANDONNEE_ALPINE,
        }
    }

    pub fn has_trail(self, trail: &str) -> bool {
        self.trails().iter().any(|candidate| *candidate == trail)
    }
}
