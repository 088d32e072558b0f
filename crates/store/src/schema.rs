// Column schemas for every record kind
//
// A field has a semantic name (the key callers and form input use), the
// header written when a sheet lacks the column, and the other headers it has
// been stored under over time. Sheets written before headers were managed
// used fixed column positions; `legacy_column` records that position.

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Header written when no existing column matches
    pub header: &'static str,
    /// Older headers, in precedence order after `header`
    pub aliases: &'static [&'static str],
    /// 1-based column in the fixed pre-header layout
    pub legacy_column: Option<usize>,
}

impl FieldSpec {
    const fn new(name: &'static str, header: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, header, aliases, legacy_column: None }
    }

    const fn at(mut self, column: usize) -> Self {
        self.legacy_column = Some(column);
        self
    }

    /// Headers this field may appear under, canonical first
    pub fn headers(&self) -> Vec<&'static str> {
        let mut out = Vec::with_capacity(self.aliases.len() + 1);
        out.push(self.header);
        out.extend_from_slice(self.aliases);
        out
    }

    /// Keys tried when resolving the field from a record: headers, then the
    /// semantic name
    pub fn lookup_keys(&self) -> Vec<&'static str> {
        let mut keys = self.headers();
        keys.push(self.name);
        keys
    }

    pub fn claims(&self, key: &str) -> bool {
        self.name == key || self.header == key || self.aliases.contains(&key)
    }
}

/// A secondary sheet joined to the primary one on the record key
#[derive(Debug)]
pub struct Extension {
    /// Key column of the secondary sheet; its `name` matches the primary key field
    pub key: FieldSpec,
    pub fields: &'static [FieldSpec],
}

impl Extension {
    pub fn claims(&self, key: &str) -> bool {
        self.key.claims(key) || self.fields.iter().any(|f| f.claims(key))
    }
}

/// True when any spec in `groups` claims `key`
pub fn is_claimed(groups: &[&[FieldSpec]], key: &str) -> bool {
    groups.iter().any(|specs| specs.iter().any(|f| f.claims(key)))
}

pub mod client {
    use super::{Extension, FieldSpec};

    pub const DATE: FieldSpec = FieldSpec::new("date", "Date", &["Timestamp", "Date_Jour"]).at(1);
    pub const REF_CLIENT: FieldSpec =
        FieldSpec::new("ref_client", "Réf. Client", &["Ref_Client", "Réf_Client", "REF CLIENT"]).at(2);
    pub const TYPE_CLIENT: FieldSpec = FieldSpec::new("type_client", "Type_Client", &["Type Client", "Type"]);
    pub const PRENOM: FieldSpec = FieldSpec::new("prenom", "Prénom", &["Prenom"]);
    pub const NOM: FieldSpec = FieldSpec::new("nom", "Nom", &["NOM"]).at(3);
    pub const TELEPHONE: FieldSpec = FieldSpec::new("telephone", "Téléphone", &["Telephone", "Tél"]).at(4);
    pub const EMAIL: FieldSpec = FieldSpec::new("email", "Email", &["E-mail", "Mail"]).at(5);
    pub const PERIODE: FieldSpec = FieldSpec::new("periode", "Période", &["Periode"]).at(6);
    pub const RESTAURATION: FieldSpec = FieldSpec::new("restauration", "Restauration", &[]).at(7);
    pub const HEBERGEMENT: FieldSpec = FieldSpec::new("hebergement", "Hébergement", &["Hebergement"]).at(8);
    pub const CHAMBRE: FieldSpec = FieldSpec::new("chambre", "Chambre", &["Type_Chambre"]).at(9);
    pub const ENFANT: FieldSpec = FieldSpec::new("enfant", "Enfant", &["Enfants"]).at(10);
    pub const AGE_ENFANT: FieldSpec =
        FieldSpec::new("age_enfant", "Âge Enfant", &["Âge_Enfant", "Age_Enfant", "Age Enfant"]).at(11);
    pub const FORFAIT: FieldSpec = FieldSpec::new("forfait", "Forfait", &[]).at(12);
    pub const CIRCUIT: FieldSpec = FieldSpec::new("circuit", "Circuit", &[]).at(13);

    pub const FIELDS: &[FieldSpec] = &[
        DATE,
        REF_CLIENT,
        TYPE_CLIENT,
        PRENOM,
        NOM,
        TELEPHONE,
        EMAIL,
        PERIODE,
        RESTAURATION,
        HEBERGEMENT,
        CHAMBRE,
        ENFANT,
        AGE_ENFANT,
        FORFAIT,
        CIRCUIT,
    ];

    // Extended sheet
    pub const DATE_ARRIVEE: FieldSpec =
        FieldSpec::new("date_arrivee", "Date_Arrivée", &["Date Arrivée", "Date_Arrivee"]);
    pub const DATE_DEPART: FieldSpec =
        FieldSpec::new("date_depart", "Date_Départ", &["Date Départ", "Date_Depart"]);
    pub const DUREE_SEJOUR: FieldSpec =
        FieldSpec::new("duree_sejour", "Durée_Séjour", &["Durée Séjour", "Duree_Sejour"]);
    pub const NOMBRE_PARTICIPANTS: FieldSpec =
        FieldSpec::new("nombre_participants", "Nombre_Participants", &["Participants"]);
    pub const NOMBRE_ADULTES: FieldSpec = FieldSpec::new("nombre_adultes", "Nombre_Adultes", &["Adultes"]);
    pub const NOMBRE_ENFANTS: FieldSpec =
        FieldSpec::new("nombre_enfants_2_12", "Enfants_2_12", &["Nombre_Enfants_2_12"]);
    pub const NOMBRE_BEBES: FieldSpec =
        FieldSpec::new("nombre_bebes_0_2", "Bébés_0_2", &["Nombre_Bebes_0_2", "Bebes_0_2"]);
    pub const WHATSAPP: FieldSpec =
        FieldSpec::new("telephone_whatsapp", "WhatsApp", &["Téléphone_WhatsApp", "Telephone_WhatsApp"]);
    pub const SGL: FieldSpec = FieldSpec::new("sgl_count", "SGL", &["Nb_SGL"]);
    pub const DBL: FieldSpec = FieldSpec::new("dbl_count", "DBL", &["Nb_DBL"]);
    pub const TWN: FieldSpec = FieldSpec::new("twn_count", "TWN", &["Nb_TWN"]);
    pub const TPL: FieldSpec = FieldSpec::new("tpl_count", "TPL", &["Nb_TPL"]);
    pub const FML: FieldSpec = FieldSpec::new("fml_count", "FML", &["Nb_FML"]);

    pub const EXTENSION: Extension = Extension {
        key: FieldSpec::new("ref_client", "Ref_Client", &["Réf. Client", "Réf_Client"]),
        fields: &[
            DATE_ARRIVEE,
            DATE_DEPART,
            DUREE_SEJOUR,
            NOMBRE_PARTICIPANTS,
            NOMBRE_ADULTES,
            NOMBRE_ENFANTS,
            NOMBRE_BEBES,
            WHATSAPP,
            SGL,
            DBL,
            TWN,
            TPL,
            FML,
        ],
    };
}

pub mod hotel {
    use super::FieldSpec;

    pub const LIEU: FieldSpec = FieldSpec::new("lieu", "Ville", &["Lieu", "VILLE"]).at(1);
    pub const NOM: FieldSpec = FieldSpec::new("nom", "HTL", &["Nom", "Hôtel", "Hotel"]).at(2);
    pub const CATEGORIE: FieldSpec = FieldSpec::new("categorie", "CATÉGORIE", &["Catégorie", "Categorie"]).at(3);
    pub const UNITE: FieldSpec = FieldSpec::new("unite", "UNITÉ", &["Unité", "Unite"]).at(4);
    pub const SINGLE: FieldSpec = FieldSpec::new("chambre_single", "SPL", &["Chambre_Single", "SGL"]).at(5);
    pub const DOUBLE: FieldSpec = FieldSpec::new("chambre_double", "DBL", &["Chambre_Double"]).at(6);
    pub const TWIN: FieldSpec = FieldSpec::new("chambre_twin", "TWINS", &["Chambre_Twin", "TWN"]).at(7);
    pub const FAMILIALE: FieldSpec = FieldSpec::new("chambre_familiale", "FML", &["Chambre_Familiale"]).at(8);
    pub const LIT_SUPP: FieldSpec = FieldSpec::new("lit_supp", "SUPP", &["Lit_Supp"]).at(9);
    pub const SUITE: FieldSpec = FieldSpec::new("suite", "SUITE", &["Suite"]).at(10);
    pub const PETIT_DEJEUNER: FieldSpec =
        FieldSpec::new("petit_dejeuner", "PDJ", &["Petit_Déjeuner", "Petit_Dejeuner"]).at(11);
    pub const DEJEUNER: FieldSpec = FieldSpec::new("dejeuner", "DJ", &["Déjeuner", "Dejeuner"]).at(12);
    pub const DINER: FieldSpec = FieldSpec::new("diner", "DR", &["Dîner", "Diner"]).at(13);
    pub const TYPE_HEBERGEMENT: FieldSpec =
        FieldSpec::new("type_hebergement", "Type_Hébergement", &["Type_Hebergement"]);
    pub const DAY_USE: FieldSpec = FieldSpec::new("day_use", "Day_Use", &["Day Use"]);
    pub const VIGNETTE: FieldSpec = FieldSpec::new("vignette", "Vignette", &[]);
    pub const TAXE_SEJOUR: FieldSpec = FieldSpec::new("taxe_sejour", "Taxe_Séjour", &["Taxe_Sejour"]);
    pub const DESCRIPTION: FieldSpec = FieldSpec::new("description", "Description", &[]);
    pub const CONTACT: FieldSpec = FieldSpec::new("contact", "Contact", &[]);
    pub const EMAIL: FieldSpec = FieldSpec::new("email", "Email", &["E-mail"]);

    pub const FIELDS: &[FieldSpec] = &[
        LIEU,
        NOM,
        CATEGORIE,
        UNITE,
        SINGLE,
        DOUBLE,
        TWIN,
        FAMILIALE,
        LIT_SUPP,
        SUITE,
        PETIT_DEJEUNER,
        DEJEUNER,
        DINER,
        TYPE_HEBERGEMENT,
        DAY_USE,
        VIGNETTE,
        TAXE_SEJOUR,
        DESCRIPTION,
        CONTACT,
        EMAIL,
    ];
}

pub mod quotation {
    use super::FieldSpec;

    pub const NUMERO: FieldSpec = FieldSpec::new("numero", "N° Devis", &["Numero", "Quote_Number", "quote_number"]);
    pub const DATE: FieldSpec = FieldSpec::new("date", "Date", &["Date_Devis"]);
    pub const CLIENT_REF: FieldSpec =
        FieldSpec::new("client_ref", "Réf. Client", &["Ref_Client", "client_id", "ref_client"]);
    pub const CLIENT_NAME: FieldSpec = FieldSpec::new("client_name", "Client", &["Nom_Client"]);
    pub const HOTEL_NAME: FieldSpec = FieldSpec::new("hotel_name", "Hôtel", &["HTL", "Hotel"]);
    pub const CITY: FieldSpec = FieldSpec::new("city", "Ville", &["Lieu"]);
    pub const NIGHTS: FieldSpec = FieldSpec::new("nights", "Nuits", &["Nuitées"]);
    pub const ADULTS: FieldSpec = FieldSpec::new("adults", "Adultes", &[]);
    pub const CHILDREN: FieldSpec = FieldSpec::new("children", "Enfants", &[]);
    pub const ROOM_TYPE: FieldSpec = FieldSpec::new("room_type", "Chambre", &["Type_Chambre"]);
    pub const MEAL_PLAN: FieldSpec = FieldSpec::new("meal_plan", "Restauration", &["Formule"]);
    pub const TOTAL_PRICE: FieldSpec = FieldSpec::new("total_price", "Total", &["Prix_Total", "Montant"]);
    pub const CURRENCY: FieldSpec = FieldSpec::new("currency", "Devise", &["Monnaie"]);

    pub const FIELDS: &[FieldSpec] = &[
        NUMERO,
        DATE,
        CLIENT_REF,
        CLIENT_NAME,
        HOTEL_NAME,
        CITY,
        NIGHTS,
        ADULTS,
        CHILDREN,
        ROOM_TYPE,
        MEAL_PLAN,
        TOTAL_PRICE,
        CURRENCY,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unambiguous(specs: &[FieldSpec]) {
        let mut seen = HashSet::new();
        for spec in specs {
            for key in spec.lookup_keys() {
                assert!(seen.insert(key), "'{}' claimed twice", key);
            }
        }
    }

    #[test]
    fn test_no_key_claimed_twice() {
        assert_unambiguous(client::FIELDS);
        assert_unambiguous(client::EXTENSION.fields);
        assert_unambiguous(hotel::FIELDS);
        assert_unambiguous(quotation::FIELDS);
    }

    #[test]
    fn test_legacy_columns_are_distinct() {
        for specs in [client::FIELDS, hotel::FIELDS] {
            let mut cols: Vec<usize> = specs.iter().filter_map(|f| f.legacy_column).collect();
            let len = cols.len();
            cols.sort();
            cols.dedup();
            assert_eq!(cols.len(), len);
            assert_eq!(cols, (1..=13).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_lookup_order() {
        assert_eq!(
            client::REF_CLIENT.lookup_keys(),
            vec!["Réf. Client", "Ref_Client", "Réf_Client", "REF CLIENT", "ref_client"]
        );
        assert!(client::EXTENSION.claims("Ref_Client"));
        assert!(client::EXTENSION.claims("dbl_count"));
        assert!(!client::EXTENSION.claims("Nom"));
    }
}
