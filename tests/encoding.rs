use heartrisk::encode::{encode, encode_features, encode_with_report, one_hot_column};
use heartrisk::record::{
    ChestPainType, ClinicalField, ExerciseAngina, RawFeature, RawPatientRecord, RestingEcg, Sex,
    StSlope,
};
use heartrisk::schema::ExpectedColumnSchema;
use heartrisk::types::AlignedFeatureVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Every category of every field expanded, as `get_dummies` does without `drop_first`.
fn full_schema() -> ExpectedColumnSchema {
    ExpectedColumnSchema::new([
        "Age",
        "RestingBP",
        "Cholesterol",
        "FastingBS",
        "MaxHR",
        "Oldpeak",
        "Sex_F",
        "Sex_M",
        "ChestPainType_ASY",
        "ChestPainType_ATA",
        "ChestPainType_NAP",
        "ChestPainType_TA",
        "RestingECG_LVH",
        "RestingECG_Normal",
        "RestingECG_ST",
        "ExerciseAngina_N",
        "ExerciseAngina_Y",
        "ST_Slope_Down",
        "ST_Slope_Flat",
        "ST_Slope_Up",
    ])
    .unwrap()
}

/// First category of each field dropped, so some valid categories have no column.
fn drop_first_schema() -> ExpectedColumnSchema {
    ExpectedColumnSchema::new([
        "Age",
        "RestingBP",
        "Cholesterol",
        "FastingBS",
        "MaxHR",
        "Oldpeak",
        "Sex_M",
        "ChestPainType_ATA",
        "ChestPainType_NAP",
        "ChestPainType_TA",
        "RestingECG_Normal",
        "RestingECG_ST",
        "ExerciseAngina_Y",
        "ST_Slope_Flat",
        "ST_Slope_Up",
    ])
    .unwrap()
}

fn scenario_one() -> RawPatientRecord {
    RawPatientRecord {
        age: 40,
        sex: Sex::Male,
        chest_pain_type: ChestPainType::AtypicalAngina,
        resting_bp: 120,
        cholesterol: 200,
        fasting_bs: 0,
        resting_ecg: RestingEcg::Normal,
        max_hr: 150,
        exercise_angina: ExerciseAngina::No,
        oldpeak: 1.0,
        st_slope: StSlope::Up,
    }
}

fn value(vector: &AlignedFeatureVector, schema: &ExpectedColumnSchema, column: &str) -> f64 {
    let idx = schema
        .position(column)
        .unwrap_or_else(|| panic!("column {column} missing from schema"));
    vector[idx]
}

fn pick<'a>(rng: &mut StdRng, known: &[&'a str]) -> &'a str {
    // One draw in five is a category the model never saw.
    if rng.gen_bool(0.2) {
        "Unseen"
    } else {
        known.choose(rng).copied().unwrap()
    }
}

fn random_record(rng: &mut StdRng) -> RawPatientRecord {
    RawPatientRecord {
        age: rng.gen_range(18..=100),
        sex: Sex::from(pick(rng, Sex::KNOWN)),
        chest_pain_type: ChestPainType::from(pick(rng, ChestPainType::KNOWN)),
        resting_bp: rng.gen_range(80..=200),
        cholesterol: rng.gen_range(100..=600),
        fasting_bs: rng.gen_range(0..=1),
        resting_ecg: RestingEcg::from(pick(rng, RestingEcg::KNOWN)),
        max_hr: rng.gen_range(60..=220),
        exercise_angina: ExerciseAngina::from(pick(rng, ExerciseAngina::KNOWN)),
        oldpeak: f64::from(rng.gen_range(0..=60u32)) / 10.0,
        st_slope: StSlope::from(pick(rng, StSlope::KNOWN)),
    }
}

/// Columns the record is allowed to set: its numeric fields plus one indicator per categorical field.
fn touched_columns(record: &RawPatientRecord) -> HashSet<String> {
    record
        .features()
        .iter()
        .map(|feature| match *feature {
            RawFeature::Numeric { field, .. } => field.column_name().to_string(),
            RawFeature::Categorical { field, category } => {
                one_hot_column(field.column_name(), category)
            }
        })
        .collect()
}

#[test]
fn scenario_one_sets_exactly_the_selected_indicators() {
    let schema = full_schema();
    let record = scenario_one();
    let vector = encode(&record, &schema);

    assert_eq!(vector.len(), schema.len());
    assert_eq!(value(&vector, &schema, "Age"), 40.0);
    assert_eq!(value(&vector, &schema, "RestingBP"), 120.0);
    assert_eq!(value(&vector, &schema, "Cholesterol"), 200.0);
    assert_eq!(value(&vector, &schema, "FastingBS"), 0.0);
    assert_eq!(value(&vector, &schema, "MaxHR"), 150.0);
    assert_eq!(value(&vector, &schema, "Oldpeak"), 1.0);

    let hot = [
        "Sex_M",
        "ChestPainType_ATA",
        "RestingECG_Normal",
        "ExerciseAngina_N",
        "ST_Slope_Up",
    ];
    for column in schema.iter().skip(6) {
        let expected = if hot.contains(&column) { 1.0 } else { 0.0 };
        assert_eq!(value(&vector, &schema, column), expected, "column {column}");
    }
}

#[test]
fn scenario_two_only_flips_the_sex_indicators() {
    let schema = full_schema();
    let male = encode(&scenario_one(), &schema);
    let female = encode(
        &RawPatientRecord {
            sex: Sex::Female,
            ..scenario_one()
        },
        &schema,
    );

    let differing: Vec<&str> = schema
        .iter()
        .zip(male.iter().zip(female.iter()))
        .filter(|(_, (m, f))| m != f)
        .map(|(column, _)| column)
        .collect();
    assert_eq!(differing, vec!["Sex_F", "Sex_M"]);
    assert_eq!(value(&female, &schema, "Sex_F"), 1.0);
    assert_eq!(value(&female, &schema, "Sex_M"), 0.0);
}

#[test]
fn dropped_first_category_leaves_every_indicator_of_the_field_at_zero() {
    let schema = drop_first_schema();
    let record = RawPatientRecord {
        age: 65,
        sex: Sex::Female,
        chest_pain_type: ChestPainType::Asymptomatic,
        resting_bp: 160,
        cholesterol: 280,
        fasting_bs: 1,
        resting_ecg: RestingEcg::LeftVentricularHypertrophy,
        max_hr: 110,
        exercise_angina: ExerciseAngina::Yes,
        oldpeak: 2.5,
        st_slope: StSlope::Flat,
    };
    let encoding = encode_with_report(record.features(), &schema);

    assert_eq!(
        encoding.vector.to_vec(),
        vec![
            65.0, 160.0, 280.0, 1.0, 110.0, 2.5, // numeric
            0.0, // Sex_M
            0.0, 0.0, 0.0, // ChestPainType
            0.0, 0.0, // RestingECG
            1.0, // ExerciseAngina_Y
            1.0, 0.0, // ST_Slope
        ]
    );
    assert_eq!(
        encoding.dropped_columns,
        vec!["Sex_F", "ChestPainType_ASY", "RestingECG_LVH"]
    );
}

#[test]
fn encoded_width_always_equals_schema_width() {
    let mut rng = StdRng::seed_from_u64(0x4845_4152);
    for schema in [full_schema(), drop_first_schema()] {
        for _ in 0..200 {
            let record = random_record(&mut rng);
            assert_eq!(encode(&record, &schema).len(), schema.len());
        }
    }
}

#[test]
fn encoding_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(17);
    let schema = full_schema();
    for _ in 0..100 {
        let record = random_record(&mut rng);
        assert_eq!(encode(&record, &schema), encode(&record, &schema));
    }
}

#[test]
fn feature_order_does_not_change_the_vector() {
    let mut rng = StdRng::seed_from_u64(99);
    let schema = full_schema();
    for _ in 0..100 {
        let record = random_record(&mut rng);
        let mut shuffled = record.features().to_vec();
        shuffled.shuffle(&mut rng);
        assert_eq!(encode_features(shuffled, &schema), encode(&record, &schema));
    }
}

#[test]
fn columns_the_record_does_not_touch_are_zero() {
    let mut rng = StdRng::seed_from_u64(2024);
    let schema = full_schema();
    for _ in 0..200 {
        let record = random_record(&mut rng);
        let touched = touched_columns(&record);
        let vector = encode(&record, &schema);
        for (column, &v) in schema.iter().zip(vector.iter()) {
            if !touched.contains(column) {
                assert_eq!(v, 0.0, "untouched column {column} for {record:?}");
            }
        }
    }
}

#[test]
fn unseen_category_encodes_like_the_field_was_never_supplied() {
    let mut rng = StdRng::seed_from_u64(5);
    let schema = full_schema();
    for _ in 0..200 {
        let record = random_record(&mut rng);
        let unknown: Vec<ClinicalField> = record
            .unknown_categories()
            .into_iter()
            .map(|(field, _)| field)
            .collect();
        let without_unknown = record
            .features()
            .into_iter()
            .filter(|feature| !unknown.contains(&feature.field()));
        assert_eq!(
            encode(&record, &schema),
            encode_features(without_unknown, &schema)
        );
    }
}

#[test]
fn unseen_categories_are_reported_as_dropped_not_rejected() {
    let schema = full_schema();
    let record = RawPatientRecord {
        sex: Sex::from("X"),
        st_slope: StSlope::from("Sideways"),
        ..scenario_one()
    };
    let encoding = encode_with_report(record.features(), &schema);
    assert_eq!(encoding.dropped_columns, vec!["Sex_X", "ST_Slope_Sideways"]);
    assert_eq!(value(&encoding.vector, &schema, "Sex_M"), 0.0);
    assert_eq!(value(&encoding.vector, &schema, "Sex_F"), 0.0);
    assert_eq!(value(&encoding.vector, &schema, "ST_Slope_Up"), 0.0);
    assert_eq!(value(&encoding.vector, &schema, "ChestPainType_ATA"), 1.0);
}

#[test]
fn record_file_round_trips_through_training_column_names() {
    let text = r#"
        Age = 65
        Sex = "F"
        ChestPainType = "ASY"
        RestingBP = 160
        Cholesterol = 280
        FastingBS = 1
        RestingECG = "LVH"
        MaxHR = 110
        ExerciseAngina = "Y"
        Oldpeak = 2.5
        ST_Slope = "Flat"
    "#;
    let record = RawPatientRecord::from_toml_str(text).unwrap();
    record.validate().unwrap();
    assert_eq!(record.sex, Sex::Female);
    assert_eq!(record.resting_ecg, RestingEcg::LeftVentricularHypertrophy);

    let reparsed = RawPatientRecord::from_toml_str(&toml::to_string(&record).unwrap()).unwrap();
    assert_eq!(reparsed, record);
}
